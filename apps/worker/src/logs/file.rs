use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{LogError, LogSink};

const LIVE_SUFFIX: &str = ".log";
const ARCHIVE_SUFFIX: &str = ".gz.b64";

/// Logs as files: `<id>.log` live, `<archive>.gz.b64` archived (gzip, base64)
///
/// Writes to a live log are serialized per log id, so compaction never
/// races an append on the same file.
pub struct FileLogSink {
    base_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl FileLogSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), locks: Mutex::new(HashMap::new()) }
    }

    pub async fn ensure_layout(&self) -> Result<(), LogError> {
        fs::create_dir_all(&self.base_dir).await?;
        Ok(())
    }

    fn path(&self, id: &str, suffix: &str) -> Result<PathBuf, LogError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(LogError::InvalidId(id.to_string()));
        }
        Ok(self.base_dir.join(format!("{id}{suffix}")))
    }

    async fn lock(&self, log_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(log_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    async fn write_archive(&self, log_id: &str, archive_id: &str) -> Result<(), LogError> {
        let source = self.path(log_id, LIVE_SUFFIX)?;
        let dest = self.path(archive_id, ARCHIVE_SUFFIX)?;

        let content = match fs::read(&source).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LogError::NotFound(log_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let encoded = STANDARD.encode(gzip(&content)?);

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&dest).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(LogError::ArchiveExists(archive_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(encoded.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn empty_live(&self, log_id: &str) -> Result<(), LogError> {
        let path = self.path(log_id, LIVE_SUFFIX)?;
        let file = match fs::OpenOptions::new().write(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LogError::NotFound(log_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.set_len(0).await?;
        Ok(())
    }
}

fn gzip(data: &[u8]) -> Result<Vec<u8>, LogError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>, LogError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[async_trait]
impl LogSink for FileLogSink {
    async fn append(&self, log_id: &str, line: &str) -> Result<(), LogError> {
        let path = self.path(log_id, LIVE_SUFFIX)?;
        let _guard = self.lock(log_id).await;
        let mut file = fs::OpenOptions::new().create(true).append(true).open(&path).await?;

        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');

        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list(&self, include_archived: bool) -> Result<Vec<String>, LogError> {
        let mut entries = fs::read_dir(&self.base_dir).await?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if let Some(id) = name.strip_suffix(LIVE_SUFFIX) {
                ids.push(id.to_string());
            } else if let Some(id) = name.strip_suffix(ARCHIVE_SUFFIX) {
                if include_archived {
                    ids.push(id.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn compress(&self, log_id: &str, archive_id: &str) -> Result<(), LogError> {
        let _guard = self.lock(log_id).await;
        self.write_archive(log_id, archive_id).await
    }

    async fn decompress(&self, archive_id: &str) -> Result<String, LogError> {
        let path = self.path(archive_id, ARCHIVE_SUFFIX)?;
        let encoded = match fs::read_to_string(&path).await {
            Ok(encoded) => encoded,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LogError::NotFound(archive_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let compressed = STANDARD.decode(encoded.trim())?;
        Ok(String::from_utf8(gunzip(&compressed)?)?)
    }

    async fn truncate(&self, log_id: &str) -> Result<(), LogError> {
        let _guard = self.lock(log_id).await;
        self.empty_live(log_id).await
    }

    async fn compact(&self, log_id: &str, archive_id: &str) -> Result<(), LogError> {
        let _guard = self.lock(log_id).await;
        self.write_archive(log_id, archive_id).await?;
        self.empty_live(log_id).await
    }
}
