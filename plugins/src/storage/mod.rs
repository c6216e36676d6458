//! Disk-backed implementations of the core persistence and handle stores.

mod file;
mod scratch;

pub use file::FileStore;
pub use scratch::FsHandleStore;
