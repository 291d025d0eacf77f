use std::io::Write;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::HttpSettings;
use crate::error::DatapointsError;

/// GET access to the remote data sources.
#[async_trait]
pub trait HttpSource: Send + Sync {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, DatapointsError>;

    async fn get_text(&self, url: &str) -> Result<String, DatapointsError> {
        let bytes = self.get_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Writes the response body to `out` and returns the number of bytes written.
    ///
    /// Sources that can stream should override this so large bodies are never
    /// held in memory.
    async fn download_to(
        &self,
        url: &str,
        out: &mut (dyn Write + Send),
    ) -> Result<u64, DatapointsError> {
        let bytes = self.get_bytes(url).await?;
        out.write_all(&bytes)
            .map_err(|err| DatapointsError::Filesystem(err.to_string()))?;
        Ok(bytes.len() as u64)
    }
}

/// One connection pool shared by every request issued through this source.
#[derive(Clone)]
pub struct ReqwestSource {
    client: Client,
}

impl ReqwestSource {
    pub fn new(settings: &HttpSettings) -> Result<Self, DatapointsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|err| DatapointsError::Transport(err.to_string()))?,
        );

        // No total deadline: a multi-gigabyte body that keeps arriving is healthy,
        // only a stalled read is a failure.
        let mut builder = Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout);
        if settings.force_close {
            // No idle connections are kept, so each one is closed after its response.
            builder = builder.pool_max_idle_per_host(0);
        }
        let client = builder
            .build()
            .map_err(|err| DatapointsError::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<Response, DatapointsError> {
        debug!(url, "HTTP GET start");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| DatapointsError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DatapointsError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl HttpSource for ReqwestSource {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, DatapointsError> {
        let start = tokio::time::Instant::now();
        let bytes = self
            .send(url)
            .await?
            .bytes()
            .await
            .map_err(|err| DatapointsError::Transport(err.to_string()))?;
        debug!(
            url,
            bytes = bytes.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "HTTP GET done"
        );
        Ok(bytes.to_vec())
    }

    async fn download_to(
        &self,
        url: &str,
        out: &mut (dyn Write + Send),
    ) -> Result<u64, DatapointsError> {
        let start = tokio::time::Instant::now();
        let mut response = self.send(url).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| DatapointsError::Transport(err.to_string()))?
        {
            out.write_all(&chunk)
                .map_err(|err| DatapointsError::Filesystem(err.to_string()))?;
            written += chunk.len() as u64;
        }
        out.flush()
            .map_err(|err| DatapointsError::Filesystem(err.to_string()))?;
        debug!(
            url,
            bytes = written,
            latency_ms = start.elapsed().as_millis() as u64,
            "HTTP GET streamed"
        );
        Ok(written)
    }
}
