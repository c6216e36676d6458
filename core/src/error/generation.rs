use std::time::Duration;

use thiserror::Error;

use crate::remote::{classify_remote_error, RemoteFailure};

/// Protocol error codes surfaced to the CLI and in structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    GeneralError = 1,
    ParseError = 2,
    ValidationError = 3,
    PreconditionFailed = 4,
    BackendError = 20,
    InputTooLarge = 22,
    Timeout = 30,
    RetriesExhausted = 31,
    AuthError = 41,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Coarse classification used to decide whether another attempt is worthwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Server,
    Auth,
    Parse,
    InputTooLarge,
    Precondition,
    Exhausted,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Server => "server",
            Self::Auth => "auth",
            Self::Parse => "parse",
            Self::InputTooLarge => "input_too_large",
            Self::Precondition => "precondition",
            Self::Exhausted => "exhausted",
            Self::Unknown => "unknown",
        }
    }
}

/// Failure of one generation operation, already mapped out of the remote boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("the API key may be invalid or lack permissions (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("prompt is too long (~{estimated} tokens, limit {limit}); shorten the research data")]
    InputTooLarge { estimated: usize, limit: usize },

    #[error("{0}")]
    Precondition(String),

    #[error("all {attempts} attempts failed: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<GenerationError>,
    },

    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl GenerationError {
    /// Map a boundary failure into the taxonomy.
    pub fn from_remote(failure: RemoteFailure) -> Self {
        let kind = classify_remote_error(&failure);
        let status = failure.status().unwrap_or(0);
        let message = failure.message().to_string();
        match kind {
            ErrorKind::Server => Self::Server { status, message },
            ErrorKind::Auth => Self::Auth { status, message },
            ErrorKind::Parse => Self::Parse(message),
            _ => Self::Unknown(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Server { .. } => ErrorKind::Server,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Parse(_) => ErrorKind::Parse,
            Self::InputTooLarge { .. } => ErrorKind::InputTooLarge,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Exhausted { .. } => ErrorKind::Exhausted,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Only transient faults are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Server | ErrorKind::Timeout)
    }

    /// The innermost error, unwrapping `Exhausted`.
    pub fn root(&self) -> &GenerationError {
        match self {
            Self::Exhausted { last, .. } => last.root(),
            other => other,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Server { .. } => ErrorCode::BackendError,
            Self::Auth { .. } => ErrorCode::AuthError,
            Self::Parse(_) => ErrorCode::ParseError,
            Self::InputTooLarge { .. } => ErrorCode::InputTooLarge,
            Self::Precondition(_) => ErrorCode::PreconditionFailed,
            Self::Exhausted { .. } => ErrorCode::RetriesExhausted,
            Self::Unknown(_) => ErrorCode::GeneralError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(GenerationError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(GenerationError::Server {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!GenerationError::Parse("x".into()).is_retryable());
        assert!(!GenerationError::Auth {
            status: 403,
            message: "denied".into()
        }
        .is_retryable());
        assert!(!GenerationError::Unknown("?".into()).is_retryable());
    }

    #[test]
    fn root_unwraps_nested_exhausted() {
        let inner = GenerationError::Server {
            status: 500,
            message: "boom".into(),
        };
        let err = GenerationError::Exhausted {
            attempts: 3,
            last: Box::new(inner.clone()),
        };
        assert_eq!(err.root(), &inner);
        assert_eq!(err.error_code(), ErrorCode::RetriesExhausted);
        assert!(err.to_string().contains("all 3 attempts failed"));
    }

    #[test]
    fn from_remote_keeps_status_and_message() {
        let err = GenerationError::from_remote(RemoteFailure::Status {
            status: 502,
            message: "bad gateway".into(),
        });
        assert_eq!(
            err,
            GenerationError::Server {
                status: 502,
                message: "bad gateway".into()
            }
        );
    }
}
