/// Per-check append-only logs and their compaction
///
/// Every evaluation appends one JSON line to the live log of its check.
/// Compaction archives a live log into a compressed blob and truncates the
/// live log; archives are never deleted here.
pub mod file;

pub use file::FileLogSink;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log {0} does not exist")]
    NotFound(String),
    #[error("archive {0} already exists")]
    ArchiveExists(String),
    #[error("invalid log id: {0:?}")]
    InvalidId(String),
    #[error("{0:#}")]
    Io(#[from] std::io::Error),
    #[error("archive is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("archive content is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[async_trait]
pub trait LogSink: Send + Sync {
    /// Append one line to a live log, creating it when missing
    async fn append(&self, log_id: &str, line: &str) -> Result<(), LogError>;

    /// Live log ids, plus archive ids when `include_archived` is set
    async fn list(&self, include_archived: bool) -> Result<Vec<String>, LogError>;

    /// Write the live log's content into a new archive
    async fn compress(&self, log_id: &str, archive_id: &str) -> Result<(), LogError>;

    /// Restore the text stored in an archive
    async fn decompress(&self, archive_id: &str) -> Result<String, LogError>;

    /// Empty a live log
    async fn truncate(&self, log_id: &str) -> Result<(), LogError>;

    /// Archive a live log and empty it as one step: no line appended while
    /// this runs can land after the read and before the truncate
    async fn compact(&self, log_id: &str, archive_id: &str) -> Result<(), LogError>;
}

/// Archive id for a live log compacted at `timestamp_ms`
pub fn archive_id(log_id: &str, timestamp_ms: i64) -> String {
    format!("{log_id}-{timestamp_ms}")
}
