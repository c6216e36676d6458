//! Remote generation boundary: request/response types, failure
//! classification, input sanitization and response shape validation.

mod classify;
pub mod parse;
mod sanitize;
mod types;

pub use classify::classify_remote_error;
pub use parse::CardContent;
pub use sanitize::sanitize;
pub use types::{
    AspectRatio, GenerateRequest, GenerateResponse, GenerationBackend, GroundingSource,
    InlinePart, Modality, OperationKind, RemoteFailure, SpeakerVoice, VoiceConfig,
};
