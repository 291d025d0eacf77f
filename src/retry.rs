use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::RetrySettings;
use crate::error::DatapointsError;

/// Bounded retry with linear backoff: attempt `n` is followed by a pause of
/// `base_delay * n` when it fails with a transient error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.max_attempts, settings.base_delay)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error,
    /// exhausts the attempt budget, or `cancel` fires. Attempts are numbered from 1.
    pub async fn run<T, F, Fut>(
        &self,
        name: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, DatapointsError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, DatapointsError>>,
    {
        let mut attempt = 1u32;
        loop {
            if cancel.is_cancelled() {
                return Err(DatapointsError::Cancelled(name.to_string()));
            }

            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => err,
            };

            if attempt >= self.max_attempts {
                return Err(DatapointsError::DownloadFailed {
                    name: name.to_string(),
                    attempts: attempt,
                    reason: err.to_string(),
                });
            }

            let delay = self.delay_for(attempt);
            warn!(
                name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "download failed, retrying"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(DatapointsError::Cancelled(name.to_string()));
                }
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
