use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::HandleError;

use super::{HandleStore, ResourceHandle};

#[derive(Default)]
struct Inner {
    live: HashMap<String, Vec<u8>>,
    created: usize,
    released: Vec<String>,
}

/// Process-memory handle store. Keeps counters so callers can verify the
/// release discipline.
#[derive(Default)]
pub struct MemoryHandleStore {
    inner: Mutex<Inner>,
}

impl MemoryHandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_count(&self) -> usize {
        self.inner.lock().map(|i| i.created).unwrap_or(0)
    }

    /// Ids in release order.
    pub fn released_ids(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|i| i.released.clone())
            .unwrap_or_default()
    }
}

impl HandleStore for MemoryHandleStore {
    fn create(&self, bytes: Vec<u8>, mime_type: &str) -> Result<ResourceHandle, HandleError> {
        let id = format!("mem-{}", uuid::Uuid::new_v4());
        let size = bytes.len();
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| HandleError::NotFound(id.clone()))?;
        inner.live.insert(id.clone(), bytes);
        inner.created += 1;
        Ok(ResourceHandle::new(id, mime_type, size))
    }

    fn read(&self, handle: &ResourceHandle) -> Result<Vec<u8>, HandleError> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.live.get(handle.id()).cloned())
            .ok_or_else(|| HandleError::NotFound(handle.id().to_string()))
    }

    fn release(&self, handle: ResourceHandle) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.live.remove(handle.id()).is_none() {
            tracing::warn!(
                target: "castforge.handles",
                id = %handle.id(),
                "release of unknown handle"
            );
        }
        inner.released.push(handle.id().to_string());
    }

    fn live_count(&self) -> usize {
        self.inner.lock().map(|i| i.live.len()).unwrap_or(0)
    }
}
