use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::ResolvedConfig;
use crate::domain::{AuthorityName, CatalogEntry, Fetched, PricePaidVersion};
use crate::error::DatapointsError;
use crate::http::HttpSource;
use crate::inspire::{BulkReport, Inspire};
use crate::parcel;
use crate::price_paid::{self, PricePaidData};

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResult {
    pub entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub paths: Vec<Utf8PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathResult {
    pub name: String,
    pub path: Utf8PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub name: String,
    pub path: Utf8PathBuf,
    pub action: String,
}

impl FetchResult {
    fn new(name: String, fetched: Fetched) -> Self {
        Self {
            name,
            action: if fetched.cached { "cache" } else { "download" }.to_string(),
            path: fetched.path,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleView {
    pub date: String,
    pub price: String,
    pub property_type: String,
    pub address: String,
    pub area: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowResult {
    pub path: Utf8PathBuf,
    pub sales: Vec<SaleView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocateResult {
    pub path: Utf8PathBuf,
    pub x: f64,
    pub y: f64,
    pub index: Option<usize>,
    pub inspire_id: Option<String>,
    pub anchor: Option<(f64, f64)>,
}

/// Entry point for the command-line operations, wiring both data sources to one HTTP pool.
pub struct App<H: HttpSource + Clone> {
    inspire: Inspire<H>,
    price_paid: PricePaidData<H>,
}

impl<H: HttpSource + Clone> App<H> {
    pub fn new(http: H, config: &ResolvedConfig) -> Self {
        Self {
            inspire: Inspire::from_config(http.clone(), config),
            price_paid: PricePaidData::from_config(http, config),
        }
    }

    pub async fn catalog(&self) -> Result<CatalogResult, DatapointsError> {
        Ok(CatalogResult {
            entries: self.inspire.find().await?,
        })
    }

    /// Downloads the named authorities, or the whole catalog for `None`.
    pub async fn fetch_inspire(
        &self,
        names: Option<Vec<String>>,
        cancel: &CancellationToken,
    ) -> Result<BulkReport, DatapointsError> {
        let entries = names
            .map(|names| {
                names
                    .iter()
                    .map(|name| Ok(CatalogEntry::named(name.parse::<AuthorityName>()?)))
                    .collect::<Result<Vec<_>, DatapointsError>>()
            })
            .transpose()?;
        self.inspire.download_all(entries, cancel).await
    }

    pub fn get_inspire(&self, name: &str) -> Result<PathResult, DatapointsError> {
        let path = self
            .inspire
            .get(name)?
            .ok_or_else(|| DatapointsError::NotFound(name.to_string()))?;
        Ok(PathResult {
            name: name.to_string(),
            path,
        })
    }

    pub fn list_inspire(&self) -> Result<ListResult, DatapointsError> {
        Ok(ListResult {
            paths: self.inspire.get_all()?,
        })
    }

    pub async fn fetch_price_paid(
        &self,
        version: PricePaidVersion,
        cancel: &CancellationToken,
    ) -> Result<FetchResult, DatapointsError> {
        let fetched = self.price_paid.download(version, cancel).await?;
        Ok(FetchResult::new(version.to_string(), fetched))
    }

    pub fn list_price_paid(&self) -> Result<ListResult, DatapointsError> {
        Ok(ListResult {
            paths: self.price_paid.get_all()?,
        })
    }

    pub fn show_price_paid(
        &self,
        path: &Utf8Path,
        limit: Option<usize>,
    ) -> Result<ShowResult, DatapointsError> {
        let sales = price_paid::read_records(path, limit)?
            .into_iter()
            .map(|record| SaleView {
                date: record.date.clone(),
                price: record.formatted_price(),
                property_type: record.property_type.label().to_string(),
                address: record.address(),
                area: record.area(),
                summary: record.summary(),
            })
            .collect();
        Ok(ShowResult {
            path: path.to_path_buf(),
            sales,
        })
    }

    pub fn locate_parcel(
        &self,
        path: &Utf8Path,
        x: f64,
        y: f64,
    ) -> Result<LocateResult, DatapointsError> {
        let parcels = self.inspire.open(path)?;
        let index = parcel::locate(&parcels, x, y);
        let hit = index.map(|index| &parcels[index]);
        Ok(LocateResult {
            path: path.to_path_buf(),
            x,
            y,
            index,
            inspire_id: hit.map(|parcel| parcel.inspire_id.clone()),
            anchor: hit.and_then(parcel::anchor),
        })
    }
}
