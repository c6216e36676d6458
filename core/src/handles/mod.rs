//! Transient binary resources (audio, images) referenced by opaque handles.
//!
//! A `ResourceHandle` is move-only: the pipeline state owns each one, and
//! `HandleStore::release` consumes it, so every handle is released at most
//! once by construction.

mod memory;

use std::fmt;

use crate::error::HandleError;

pub use memory::MemoryHandleStore;

pub struct ResourceHandle {
    id: String,
    mime_type: String,
    size: usize,
}

impl ResourceHandle {
    pub fn new(id: impl Into<String>, mime_type: impl Into<String>, size: usize) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            size,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "audio/wav" | "audio/x-wav" => "wav",
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "video/mp4" => "mp4",
            _ => "bin",
        }
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .finish()
    }
}

/// Creates, reads and releases handle-backed binary data.
pub trait HandleStore: Send + Sync {
    fn create(&self, bytes: Vec<u8>, mime_type: &str) -> Result<ResourceHandle, HandleError>;

    fn read(&self, handle: &ResourceHandle) -> Result<Vec<u8>, HandleError>;

    /// Free the backing resource. Failures are logged, never surfaced.
    fn release(&self, handle: ResourceHandle);

    /// Handles created and not yet released.
    fn live_count(&self) -> usize;
}
