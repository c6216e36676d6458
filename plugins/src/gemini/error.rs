use std::{error::Error as StdError, fmt};

use castforge_core::remote::RemoteFailure;

const BODY_PREVIEW_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiHttpErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Decode,
    Status,
    Unknown,
}

impl GeminiHttpErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Decode => "decode",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GeminiHttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct GeminiHttpError {
    kind: GeminiHttpErrorKind,
    status: Option<u16>,
    url: Option<String>,
    message: String,
    source: Option<anyhow::Error>,
}

impl GeminiHttpError {
    pub fn kind(&self) -> GeminiHttpErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, url: String) -> Self {
        let kind = if err.is_timeout() {
            GeminiHttpErrorKind::Timeout
        } else if err.is_connect() {
            GeminiHttpErrorKind::Connect
        } else if err.is_request() {
            GeminiHttpErrorKind::Request
        } else if err.is_body() {
            GeminiHttpErrorKind::Body
        } else if err.is_decode() {
            GeminiHttpErrorKind::Decode
        } else {
            GeminiHttpErrorKind::Unknown
        };
        let status = err.status().map(|s| s.as_u16());
        let message = err.to_string();
        GeminiHttpError {
            kind,
            status,
            url: Some(url),
            message,
            source: Some(anyhow::Error::new(err)),
        }
    }

    pub(crate) fn status_error(status: u16, url: String, preview: String) -> Self {
        GeminiHttpError {
            kind: GeminiHttpErrorKind::Status,
            status: Some(status),
            url: Some(url),
            message: preview,
            source: None,
        }
    }

    pub(crate) fn decode_error(status: u16, url: String, message: String) -> Self {
        GeminiHttpError {
            kind: GeminiHttpErrorKind::Decode,
            status: Some(status),
            url: Some(url),
            message,
            source: None,
        }
    }

    /// The boundary view consumed by the core classifier.
    pub fn into_failure(self) -> RemoteFailure {
        let message = self.to_string();
        match self.kind {
            GeminiHttpErrorKind::Status => RemoteFailure::Status {
                status: self.status.unwrap_or(0),
                message,
            },
            GeminiHttpErrorKind::Decode | GeminiHttpErrorKind::Body => {
                RemoteFailure::Decode { message }
            }
            GeminiHttpErrorKind::Timeout => RemoteFailure::Transport {
                message,
                timed_out: true,
            },
            GeminiHttpErrorKind::Connect
            | GeminiHttpErrorKind::Request
            | GeminiHttpErrorKind::Unknown => RemoteFailure::Transport {
                message,
                timed_out: false,
            },
        }
    }
}

impl fmt::Display for GeminiHttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gemini http error kind={}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        if let Some(url) = &self.url {
            write!(f, " url={}", url)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl StdError for GeminiHttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

pub(crate) fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().nth(BODY_PREVIEW_LIMIT).is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_handles_empty_and_long_bodies() {
        assert_eq!(preview_body("   "), "<empty body>");
        let preview = preview_body(&"a".repeat(BODY_PREVIEW_LIMIT + 10));
        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), BODY_PREVIEW_LIMIT + 3);
    }

    #[test]
    fn status_error_keeps_code_and_url() {
        let err = GeminiHttpError::status_error(
            503,
            "https://example.com/v1alpha/models/m:generateContent".to_string(),
            "overloaded".to_string(),
        );
        let msg = err.to_string();
        assert!(msg.contains("kind=status"));
        assert!(msg.contains("status=503"));
        assert!(msg.contains("overloaded"));
        assert!(matches!(
            err.into_failure(),
            RemoteFailure::Status { status: 503, .. }
        ));
    }

    #[test]
    fn decode_error_maps_to_decode_failure() {
        let err = GeminiHttpError::decode_error(200, "u".into(), "no candidates".into());
        assert!(matches!(err.into_failure(), RemoteFailure::Decode { .. }));
    }
}
