use std::sync::Arc;

use anyhow::Result;

use castforge_core::config::{resolve_data_dir, AppConfig};
use castforge_core::handles::{HandleStore, MemoryHandleStore};
use castforge_core::pipeline::{MemoryStore, PersistenceStore};
use castforge_core::remote::GenerationBackend;

use crate::gemini::GeminiBackend;
use crate::storage::{FileStore, FsHandleStore};

pub fn build_backend(cfg: &AppConfig) -> Result<Arc<dyn GenerationBackend>> {
    Ok(Arc::new(GeminiBackend::new(&cfg.remote)?))
}

/// File store under the data dir when autosave is on; otherwise nothing
/// outlives the process.
pub fn build_store(cfg: &AppConfig) -> Result<Arc<dyn PersistenceStore>> {
    if !cfg.autosave.enabled {
        return Ok(Arc::new(MemoryStore::default()));
    }
    let dir = resolve_data_dir(cfg)?.join("autosave");
    Ok(Arc::new(FileStore::new(dir, &cfg.autosave.key)))
}

pub fn build_handles(cfg: &AppConfig) -> Result<Arc<dyn HandleStore>> {
    let dir = resolve_data_dir(cfg)?;
    match FsHandleStore::in_session_dir(&dir) {
        Ok(store) => Ok(Arc::new(store)),
        Err(e) => {
            tracing::warn!(
                target: "castforge.handles",
                dir = %dir.display(),
                error = %e,
                "scratch dir unavailable, keeping resources in memory"
            );
            Ok(Arc::new(MemoryHandleStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.autosave.data_dir = Some(dir.to_string_lossy().to_string());
        cfg
    }

    #[tokio::test]
    async fn store_lands_under_the_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config_in(tmp.path());
        let store = build_store(&cfg).unwrap();
        store
            .save(&castforge_core::pipeline::PersistedRecord {
                script_text: "Q: hi".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(tmp
            .path()
            .join("autosave")
            .join("nano-creator-autosave.json")
            .exists());
    }

    #[test]
    fn backend_needs_a_key() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = config_in(tmp.path());
        assert!(build_backend(&cfg).is_err());
        cfg.remote.api_key = "k".into();
        assert_eq!(build_backend(&cfg).unwrap().name(), "gemini");
    }

    #[test]
    fn handles_use_a_scratch_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let handles = build_handles(&config_in(tmp.path())).unwrap();
        let h = handles.create(vec![0; 8], "image/png").unwrap();
        assert_eq!(handles.live_count(), 1);
        handles.release(h);
        assert_eq!(handles.live_count(), 0);
    }
}
