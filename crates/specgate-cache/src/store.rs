//! Checksum state storage.

use crate::keys::sanitize_key;
use crate::types::ChecksumRecord;
use async_trait::async_trait;
use specgate_core::{Error, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Trait for checksum state backends.
#[async_trait]
pub trait ChecksumStore: Send + Sync {
    /// Load the record stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<ChecksumRecord>>;

    /// Store `record` under `key`, replacing the previous one.
    async fn save(&self, key: &str, record: &ChecksumRecord) -> Result<()>;
}

/// Stores one small JSON file per key in a directory.
///
/// The directory belongs to a single build's output, so no locking is done.
pub struct FilesystemChecksumStore {
    root_dir: PathBuf,
}

impl FilesystemChecksumStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn key_path(&self, key: &str) -> PathBuf {
        self.root_dir.join(format!("{}.json", sanitize_key(key)))
    }
}

#[async_trait]
impl ChecksumStore for FilesystemChecksumStore {
    async fn load(&self, key: &str) -> Result<Option<ChecksumRecord>> {
        let path = self.key_path(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Internal(format!(
                    "Failed to read checksum {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // Unreadable state forces a fresh run.
                warn!(path = %path.display(), error = %e, "Ignoring corrupt checksum file");
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, record: &ChecksumRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await.map_err(|e| {
            Error::Internal(format!("Failed to create checksum dir: {}", e))
        })?;

        let path = self.key_path(key);
        let staging = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(record)?;

        tokio::fs::write(&staging, content)
            .await
            .map_err(|e| Error::Internal(format!("Failed to write checksum: {}", e)))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| Error::Internal(format!("Failed to write checksum: {}", e)))?;

        debug!(path = %path.display(), fingerprint = %record.fingerprint, "Checksum saved");
        Ok(())
    }
}
