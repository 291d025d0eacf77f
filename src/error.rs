use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DatapointsError {
    #[error("corrupt archive for {name}: {reason}")]
    CorruptArchive { name: String, reason: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("server returned status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("download of {name} failed after {attempts} attempts: {reason}")]
    #[diagnostic(help("the remote server may be unavailable; try again later"))]
    DownloadFailed {
        name: String,
        attempts: u32,
        reason: String,
    },

    #[error("{failed} of {total} downloads failed")]
    BulkIncomplete { failed: usize, total: usize },

    #[error("download of {0} was cancelled")]
    Cancelled(String),

    #[error("archive for {name} does not contain {member}")]
    MissingArchiveMember { name: String, member: String },

    #[error("invalid authority name: {0:?}")]
    InvalidName(String),

    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("catalog listing is misaligned: {names} names but {links} links")]
    CatalogMismatch { names: usize, links: usize },

    #[error("not found in local cache: {0}")]
    NotFound(String),

    #[error("malformed record on line {line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("invalid {field} value on line {line}: {value:?}")]
    InvalidField {
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("unknown {field} code: {code:?}")]
    UnknownCode { field: &'static str, code: String },

    #[error("invalid price paid version: {0}")]
    #[diagnostic(help("use monthly-update, complete, or a four digit year"))]
    InvalidVersion(String),

    #[error("failed to read price paid data: {0}")]
    PricePaidRead(String),

    #[error("invalid parcel geometry: {0}")]
    Geometry(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl DatapointsError {
    /// Whether a failed download attempt may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        match self {
            DatapointsError::CorruptArchive { .. } | DatapointsError::Transport(_) => true,
            DatapointsError::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds() {
        let corrupt = DatapointsError::CorruptArchive {
            name: "Adur".to_string(),
            reason: "invalid Zip archive".to_string(),
        };
        assert!(corrupt.is_transient());
        assert!(DatapointsError::Transport("reset".to_string()).is_transient());
        assert!(
            DatapointsError::HttpStatus {
                status: 503,
                url: "http://x".to_string()
            }
            .is_transient()
        );
        assert!(
            !DatapointsError::HttpStatus {
                status: 404,
                url: "http://x".to_string()
            }
            .is_transient()
        );
        assert!(!DatapointsError::Filesystem("denied".to_string()).is_transient());
    }
}
