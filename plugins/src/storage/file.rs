use std::path::{Path, PathBuf};

use async_trait::async_trait;
use castforge_core::error::StoreError;
use castforge_core::pipeline::{PersistedRecord, PersistenceStore};

/// One JSON document per key under a directory. Writes go to a temp file
/// that is renamed over the target, so a crash never leaves a torn record.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        let file = format!("{}.json", sanitize_key(key));
        Self {
            path: dir.as_ref().join(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "autosave".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl PersistenceStore for FileStore {
    async fn load(&self) -> Result<Option<PersistedRecord>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = serde_json::from_slice::<PersistedRecord>(&bytes)?;
        tracing::debug!(
            target: "castforge.store",
            stage = "store.load",
            path = %self.path.display(),
            timestamp = record.timestamp
        );
        Ok(Some(record))
    }

    async fn save(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tracing::debug!(
            target: "castforge.store",
            stage = "store.save",
            path = %self.path.display(),
            bytes = json.len()
        );
        Ok(())
    }

    async fn delete(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
