use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{Category, RecordStore, StoreError, check_key};

/// JSON-file store: one `<base>/<category>/<id>.json` per record
///
/// Updates are written to a temporary sibling and renamed into place, so a
/// reader sees either the old record or the new one, never a partial write.
pub struct FileStore {
    base_dir: PathBuf,
    pending: AtomicU64,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), pending: AtomicU64::new(0) }
    }

    /// Create the category directories if they are missing
    pub async fn ensure_layout(&self) -> Result<(), StoreError> {
        for category in [Category::Checks, Category::Users] {
            fs::create_dir_all(self.category_dir(category)).await?;
        }
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn category_dir(&self, category: Category) -> PathBuf {
        self.base_dir.join(category.as_str())
    }

    fn record_path(&self, category: Category, id: &str) -> Result<PathBuf, StoreError> {
        check_key(id)?;
        Ok(self.category_dir(category).join(format!("{id}.json")))
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn list(&self, category: Category) -> Result<Vec<String>, StoreError> {
        let mut entries = fs::read_dir(self.category_dir(category)).await?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(|name| name.strip_suffix(".json")) {
                ids.push(id.to_string());
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn read(&self, category: Category, id: &str) -> Result<Option<Value>, StoreError> {
        let path = self.record_path(category, id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, category: Category, id: &str, record: &Value) -> Result<(), StoreError> {
        let path = self.record_path(category, id)?;
        let data = serde_json::to_vec(record)?;

        match fs::metadata(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound { category, id: id.to_string() });
            }
            Err(e) => return Err(e.into()),
        }

        let n = self.pending.fetch_add(1, Ordering::Relaxed);
        let tmp = self.category_dir(category).join(format!("{id}.json.{n}.tmp"));

        if let Err(e) = write_new(&tmp, &data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn create(&self, category: Category, id: &str, record: &Value) -> Result<(), StoreError> {
        let path = self.record_path(category, id)?;
        let data = serde_json::to_vec(record)?;

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists { category, id: id.to_string() });
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }
}

async fn write_new(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(())
}
