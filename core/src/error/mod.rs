#[allow(clippy::module_inception)]
pub mod error;
pub mod generation;

pub use error::{CliError, EncodeError, HandleError, SessionError, StoreError};
pub use generation::{ErrorCode, ErrorKind, GenerationError};
