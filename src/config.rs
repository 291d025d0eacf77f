use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::DatapointsError;

pub const DEFAULT_CONFIG_FILE: &str = "datapoints.json";
pub const DEFAULT_INSPIRE_BASE: &str = "https://use-land-property-data.service.gov.uk";
pub const DEFAULT_PRICE_PAID_BASE: &str =
    "http://prod.publicdata.landregistry.gov.uk.s3-website-eu-west-1.amazonaws.com";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub downloads_root: Option<String>,
    #[serde(default)]
    pub inspire_base: Option<String>,
    #[serde(default)]
    pub price_paid_base: Option<String>,
    #[serde(default)]
    pub retry: Option<RetryEntry>,
    #[serde(default)]
    pub http: Option<HttpEntry>,
    #[serde(default)]
    pub max_concurrent: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RetryEntry {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub base_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HttpEntry {
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
    #[serde(default)]
    pub force_close: Option<bool>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    /// Longest wait for the next chunk of a response; resets after every read.
    pub read_timeout: Duration,
    pub force_close: bool,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(120),
            force_close: true,
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub downloads_root: Utf8PathBuf,
    pub inspire_base: String,
    pub price_paid_base: String,
    pub retry: RetrySettings,
    pub http: HttpSettings,
    pub max_concurrent: Option<usize>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            downloads_root: Utf8PathBuf::from("downloads"),
            inspire_base: DEFAULT_INSPIRE_BASE.to_string(),
            price_paid_base: DEFAULT_PRICE_PAID_BASE.to_string(),
            retry: RetrySettings::default(),
            http: HttpSettings::default(),
            max_concurrent: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `datapoints.json` from the working directory when no
    /// path is given. A missing default file yields the built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DatapointsError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DatapointsError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| DatapointsError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, DatapointsError> {
        let defaults = ResolvedConfig::default();

        let retry = match config.retry {
            Some(entry) => {
                let max_attempts = entry
                    .max_attempts
                    .unwrap_or(defaults.retry.max_attempts);
                if max_attempts == 0 {
                    return Err(DatapointsError::ConfigParse(
                        "retry.max_attempts must be at least 1".to_string(),
                    ));
                }
                RetrySettings {
                    max_attempts,
                    base_delay: entry
                        .base_delay_ms
                        .map(Duration::from_millis)
                        .unwrap_or(defaults.retry.base_delay),
                }
            }
            None => defaults.retry,
        };

        let http = match config.http {
            Some(entry) => HttpSettings {
                connect_timeout: entry
                    .connect_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.http.connect_timeout),
                read_timeout: entry
                    .read_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.http.read_timeout),
                force_close: entry.force_close.unwrap_or(defaults.http.force_close),
                user_agent: entry.user_agent.unwrap_or(defaults.http.user_agent),
            },
            None => defaults.http,
        };

        if config.max_concurrent == Some(0) {
            return Err(DatapointsError::ConfigParse(
                "max_concurrent must be at least 1".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            downloads_root: config
                .downloads_root
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.downloads_root),
            inspire_base: config
                .inspire_base
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.inspire_base),
            price_paid_base: config
                .price_paid_base
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.price_paid_base),
            retry,
            http,
            max_concurrent: config.max_concurrent,
        })
    }
}

pub fn default_user_agent() -> String {
    format!("datapoints/{}", env!("CARGO_PKG_VERSION"))
}
