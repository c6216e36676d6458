use thiserror::Error;

use super::generation::GenerationError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("session failed: {0}")]
    Session(#[from] SessionError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Errors raised by the session controller.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("persistence error: {0}")]
    Store(#[from] StoreError),
    #[error("resource handle error: {0}")]
    Handle(#[from] HandleError),
    #[error("audio encoding failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("unknown persona: {0}")]
    UnknownPersona(String),
}

impl SessionError {
    /// Shorthand for a precondition failure, which never reaches the backend.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Generation(GenerationError::Precondition(message.into()))
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Generation(GenerationError::Precondition(_)))
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum HandleError {
    #[error("handle {0} is not live")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("no sample data")]
    Empty,
    #[error("channel count must be positive")]
    NoChannels,
    #[error("unsupported bit depth: {0}")]
    BitDepth(u16),
    #[error("data length {len} is not a multiple of block align {block_align}")]
    Misaligned { len: usize, block_align: usize },
    #[error("data length {0} exceeds the container limit")]
    TooLarge(usize),
}
