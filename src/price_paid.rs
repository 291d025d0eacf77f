use camino::{Utf8Path, Utf8PathBuf};
use csv::ReaderBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::domain::{Fetched, PricePaidVersion};
use crate::error::DatapointsError;
use crate::http::HttpSource;
use crate::record::PricePaidRecord;
use crate::retry::RetryPolicy;
use crate::store::Store;

/// A raw Price Paid row: the fields exactly as read, in file order.
pub type PricePaidRow = Vec<String>;

/// Downloads and caches HM Land Registry Price Paid Data.
pub struct PricePaidData<H: HttpSource> {
    http: H,
    store: Store,
    retry: RetryPolicy,
    base_url: String,
}

impl<H: HttpSource> PricePaidData<H> {
    pub fn new(http: H, store: Store, retry: RetryPolicy, base_url: impl Into<String>) -> Self {
        Self {
            http,
            store,
            retry,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(http: H, config: &ResolvedConfig) -> Self {
        Self::new(
            http,
            Store::new(config.downloads_root.clone()),
            RetryPolicy::from_settings(&config.retry),
            config.price_paid_base.clone(),
        )
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn url(&self, version: PricePaidVersion) -> String {
        format!("{}/pp-{version}.txt", self.base_url)
    }

    pub async fn download(
        &self,
        version: PricePaidVersion,
        cancel: &CancellationToken,
    ) -> Result<Fetched, DatapointsError> {
        let target = self.store.price_paid_path(version);
        if target.as_std_path().exists() {
            debug!(%version, path = %target, "already cached");
            return Ok(Fetched {
                path: target,
                cached: true,
            });
        }

        let url = self.url(version);
        let label = format!("pp-{version}");
        let url_ref = url.as_str();
        let label_ref = label.as_str();
        let target_ref = target.as_path();
        let bytes = self
            .retry
            .run(label_ref, cancel, move |attempt| async move {
                debug!(name = label_ref, attempt, url = url_ref, "fetching price paid data");
                // A fresh partial file per attempt; dropping it on failure deletes it.
                let mut partial = Store::partial_file(target_ref)?;
                let written = tokio::select! {
                    _ = cancel.cancelled() => Err(DatapointsError::Cancelled(label_ref.to_string())),
                    result = self.http.download_to(url_ref, partial.as_file_mut()) => result,
                }?;
                Store::persist_partial(partial, target_ref)?;
                Ok(written)
            })
            .await?;

        info!(%version, path = %target, bytes, "price paid data downloaded");
        Ok(Fetched {
            path: target,
            cached: false,
        })
    }

    pub fn get(&self, version: PricePaidVersion) -> Result<Option<Utf8PathBuf>, DatapointsError> {
        self.store.get_price_paid(version)
    }

    pub fn get_all(&self) -> Result<Vec<Utf8PathBuf>, DatapointsError> {
        self.store.list_price_paid()
    }
}

/// Reads every row of a Price Paid file without interpreting the fields.
pub fn read_rows(path: &Utf8Path) -> Result<Vec<PricePaidRow>, DatapointsError> {
    let mut reader = open_reader(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| DatapointsError::PricePaidRead(err.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Parses up to `limit` rows (all when `None`) into records, stopping at the first bad row.
pub fn read_records(
    path: &Utf8Path,
    limit: Option<usize>,
) -> Result<Vec<PricePaidRecord>, DatapointsError> {
    let mut reader = open_reader(path)?;
    let mut records = Vec::new();
    for (index, record) in reader
        .records()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
    {
        let record = record.map_err(|err| DatapointsError::PricePaidRead(err.to_string()))?;
        let line = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(index as u64 + 1);
        let fields = record.iter().collect::<Vec<_>>();
        records.push(PricePaidRecord::from_row(line, &fields)?);
    }
    Ok(records)
}

fn open_reader(path: &Utf8Path) -> Result<csv::Reader<std::fs::File>, DatapointsError> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path.as_std_path())
        .map_err(|err| DatapointsError::PricePaidRead(format!("{path}: {err}")))
}
