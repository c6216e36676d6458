use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use castforge_core::error::HandleError;
use castforge_core::handles::{HandleStore, ResourceHandle};

/// Handle store backed by files in a per-process scratch directory.
/// Releasing a handle deletes its file.
pub struct FsHandleStore {
    dir: PathBuf,
    live: AtomicUsize,
}

impl FsHandleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, HandleError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            live: AtomicUsize::new(0),
        })
    }

    /// A fresh `scratch-<uuid>` directory under `parent`.
    pub fn in_session_dir(parent: &Path) -> Result<Self, HandleError> {
        Self::new(parent.join(format!("scratch-{}", uuid::Uuid::new_v4())))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, handle: &ResourceHandle) -> PathBuf {
        self.dir.join(format!("{}.{}", handle.id(), handle.extension()))
    }
}

impl HandleStore for FsHandleStore {
    fn create(&self, bytes: Vec<u8>, mime_type: &str) -> Result<ResourceHandle, HandleError> {
        let handle = ResourceHandle::new(
            format!("fs-{}", uuid::Uuid::new_v4()),
            mime_type,
            bytes.len(),
        );
        std::fs::write(self.path_of(&handle), &bytes)?;
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn read(&self, handle: &ResourceHandle) -> Result<Vec<u8>, HandleError> {
        match std::fs::read(self.path_of(handle)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HandleError::NotFound(handle.id().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn release(&self, handle: ResourceHandle) {
        let path = self.path_of(&handle);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
            Err(e) => tracing::warn!(
                target: "castforge.handles",
                id = %handle.id(),
                path = %path.display(),
                error = %e,
                "failed to release handle"
            ),
        }
    }

    fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for FsHandleStore {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            tracing::debug!(target: "castforge.handles", error = %e, "scratch cleanup skipped");
        }
    }
}
