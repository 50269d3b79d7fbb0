/// Record store abstraction
///
/// The worker reads check records and writes back their evaluated state.
/// Stores are last-write-wins with no versioning; concurrent writes to
/// distinct keys must be safe, writes to the same key may race.
pub mod file;

pub use file::FileStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Record categories known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Checks,
    Users,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Checks => "checks",
            Category::Users => "users",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{category}/{id} does not exist")]
    NotFound { category: Category, id: String },
    #[error("{category}/{id} already exists")]
    AlreadyExists { category: Category, id: String },
    #[error("invalid record key: {0:?}")]
    InvalidKey(String),
    #[error("{0:#}")]
    Io(#[from] std::io::Error),
    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keyed, durable storage of raw JSON records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All keys in a category
    async fn list(&self, category: Category) -> Result<Vec<String>, StoreError>;

    /// Read a record, `None` when the key does not exist
    async fn read(&self, category: Category, id: &str) -> Result<Option<Value>, StoreError>;

    /// Overwrite an existing record
    async fn update(&self, category: Category, id: &str, record: &Value) -> Result<(), StoreError>;

    /// Create a new record, failing if the key is taken
    async fn create(&self, category: Category, id: &str, record: &Value) -> Result<(), StoreError>;
}

/// Keys become file names, so anything that could escape the category
/// directory is refused
pub(crate) fn check_key(id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
        return Err(StoreError::InvalidKey(id.to_string()));
    }
    Ok(())
}
