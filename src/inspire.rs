use camino::{Utf8Path, Utf8PathBuf};
use futures::stream::{self, StreamExt};
use reqwest::Url;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive;
use crate::catalog;
use crate::config::ResolvedConfig;
use crate::domain::{AuthorityName, CatalogEntry, Fetched};
use crate::error::DatapointsError;
use crate::http::HttpSource;
use crate::parcel::{self, Parcel};
use crate::retry::RetryPolicy;
use crate::staging::StagingStore;
use crate::store::Store;

/// The member of each authority archive that holds the parcel polygons.
pub const PARCELS_FILE: &str = "Land_Registry_Cadastral_Parcels.gml";
const DOWNLOAD_PATH: [&str; 3] = ["datasets", "inspire", "download"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Cached,
    Downloaded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkItem {
    pub name: String,
    pub status: ItemStatus,
    pub path: Option<Utf8PathBuf>,
    pub error: Option<String>,
}

impl BulkItem {
    fn from_result(name: &AuthorityName, result: Result<Fetched, DatapointsError>) -> Self {
        match result {
            Ok(fetched) => Self {
                name: name.to_string(),
                status: if fetched.cached {
                    ItemStatus::Cached
                } else {
                    ItemStatus::Downloaded
                },
                path: Some(fetched.path),
                error: None,
            },
            Err(err) => Self {
                name: name.to_string(),
                status: ItemStatus::Failed,
                path: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Per-item results of a bulk download, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub items: Vec<BulkItem>,
}

impl BulkReport {
    pub fn paths(&self) -> Vec<&Utf8Path> {
        self.items
            .iter()
            .filter_map(|item| item.path.as_deref())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BulkItem> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Failed)
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Downloads and caches INSPIRE index polygons, one archive per local authority.
pub struct Inspire<H: HttpSource> {
    http: H,
    store: Store,
    staging: StagingStore,
    retry: RetryPolicy,
    base_url: String,
    max_concurrent: Option<usize>,
}

impl<H: HttpSource> Inspire<H> {
    pub fn new(http: H, store: Store, retry: RetryPolicy, base_url: impl Into<String>) -> Self {
        let staging = StagingStore::new(store.temp_dir());
        Self {
            http,
            store,
            staging,
            retry,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_concurrent: None,
        }
    }

    pub fn from_config(http: H, config: &ResolvedConfig) -> Self {
        Self::new(
            http,
            Store::new(config.downloads_root.clone()),
            RetryPolicy::from_settings(&config.retry),
            config.inspire_base.clone(),
        )
        .with_max_concurrent(config.max_concurrent)
    }

    pub fn with_max_concurrent(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent = limit;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn listing_url(&self) -> String {
        format!("{}/{}", self.base_url, DOWNLOAD_PATH.join("/"))
    }

    /// `{base}/datasets/inspire/download/{file_stem}.zip`, with the last segment percent-encoded.
    pub fn archive_url(&self, name: &AuthorityName) -> Result<String, DatapointsError> {
        let invalid =
            || DatapointsError::ConfigParse(format!("invalid inspire_base url {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(DOWNLOAD_PATH)
            .push(&format!("{}.zip", name.file_stem()));
        Ok(url.to_string())
    }

    /// Lists every authority offered on the download page.
    pub async fn find(&self) -> Result<Vec<CatalogEntry>, DatapointsError> {
        let url = self.listing_url();
        debug!(url = %url, "fetching catalog");
        let html = self.http.get_text(&url).await?;
        let entries = catalog::parse_listing(&html, &url)?;
        info!(count = entries.len(), "catalog loaded");
        Ok(entries)
    }

    pub async fn download(
        &self,
        name: &AuthorityName,
        cancel: &CancellationToken,
    ) -> Result<Fetched, DatapointsError> {
        self.download_entry(&CatalogEntry::named(name.clone()), cancel)
            .await
    }

    /// Downloads every entry concurrently, or the whole catalog when `entries` is `None`.
    ///
    /// One item failing does not stop the others; only catalog discovery can
    /// fail the batch as a whole.
    pub async fn download_all(
        &self,
        entries: Option<Vec<CatalogEntry>>,
        cancel: &CancellationToken,
    ) -> Result<BulkReport, DatapointsError> {
        let entries = match entries {
            Some(entries) => entries,
            None => self.find().await?,
        };
        let limit = self.max_concurrent.unwrap_or(entries.len()).max(1);
        info!(count = entries.len(), limit, "starting bulk download");

        let items = stream::iter(entries.iter().map(move |entry| async move {
            let result = self.download_entry(entry, cancel).await;
            if let Err(err) = &result {
                warn!(name = %entry.name, error = %err, "giving up on authority");
            }
            BulkItem::from_result(&entry.name, result)
        }))
        .buffered(limit)
        .collect::<Vec<_>>()
        .await;

        let report = BulkReport { items };
        info!(
            total = report.items.len(),
            failed = report.failures().count(),
            "bulk download finished"
        );
        Ok(report)
    }

    pub async fn download_entry(
        &self,
        entry: &CatalogEntry,
        cancel: &CancellationToken,
    ) -> Result<Fetched, DatapointsError> {
        let target = self.store.polygon_path(&entry.name);
        if target.as_std_path().exists() {
            debug!(name = %entry.name, path = %target, "already cached");
            return Ok(Fetched {
                path: target,
                cached: true,
            });
        }

        let source_url = match &entry.source_url {
            Some(url) => url.clone(),
            None => self.archive_url(&entry.name)?,
        };
        let url = source_url.as_str();
        let path = self
            .retry
            .run(entry.name.as_str(), cancel, move |attempt| {
                self.attempt(entry, url, attempt, cancel)
            })
            .await?;
        info!(name = %entry.name, path = %path, "index polygons downloaded");
        Ok(Fetched {
            path,
            cached: false,
        })
    }

    async fn attempt(
        &self,
        entry: &CatalogEntry,
        url: &str,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<Utf8PathBuf, DatapointsError> {
        let name = entry.name.as_str();
        debug!(name, attempt, url, "fetching archive");
        let area = self.staging.begin()?;
        let fetched = tokio::select! {
            _ = cancel.cancelled() => Err(DatapointsError::Cancelled(name.to_string())),
            result = archive::fetch_and_extract(&self.http, name, url, area.path().as_std_path()) => result,
        };
        if let Err(err) = fetched {
            self.staging.discard(area)?;
            return Err(err);
        }
        self.staging.promote(
            area,
            PARCELS_FILE,
            &self.store.index_polygons_dir(),
            &Store::polygon_file_name(&entry.name),
        )
    }

    pub fn get(&self, name: &str) -> Result<Option<Utf8PathBuf>, DatapointsError> {
        self.store.get_polygon(name)
    }

    pub fn get_all(&self) -> Result<Vec<Utf8PathBuf>, DatapointsError> {
        self.store.list_polygons()
    }

    pub fn open(&self, path: &Utf8Path) -> Result<Vec<Parcel>, DatapointsError> {
        parcel::read_parcels(path)
    }
}
