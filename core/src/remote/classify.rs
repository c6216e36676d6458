use crate::error::ErrorKind;

use super::types::RemoteFailure;

const AUTH_MARKERS: [&str; 4] = ["API key", "API_KEY", "NOT_FOUND", "permission denied"];

/// Classify a boundary failure.
///
/// 5xx, 408, 429 and transport failures are transient. 401, 403 and
/// credential messages are `Auth`; any other status is `Unknown` and still
/// terminal. Decode failures mean the call succeeded but the envelope was
/// malformed.
pub fn classify_remote_error(failure: &RemoteFailure) -> ErrorKind {
    match failure {
        RemoteFailure::Status { status, message } => match *status {
            500..=599 | 408 | 429 => ErrorKind::Server,
            401 | 403 => ErrorKind::Auth,
            _ if mentions_credentials(message) => ErrorKind::Auth,
            _ => ErrorKind::Unknown,
        },
        RemoteFailure::Transport { message, .. } => {
            if mentions_credentials(message) {
                ErrorKind::Auth
            } else {
                ErrorKind::Server
            }
        }
        RemoteFailure::Decode { .. } => ErrorKind::Parse,
    }
}

fn mentions_credentials(message: &str) -> bool {
    AUTH_MARKERS.iter().any(|m| message.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> RemoteFailure {
        RemoteFailure::Status {
            status: code,
            message: "x".into(),
        }
    }

    #[test]
    fn status_classes() {
        assert_eq!(classify_remote_error(&status(500)), ErrorKind::Server);
        assert_eq!(classify_remote_error(&status(503)), ErrorKind::Server);
        assert_eq!(classify_remote_error(&status(429)), ErrorKind::Server);
        assert_eq!(classify_remote_error(&status(401)), ErrorKind::Auth);
        assert_eq!(classify_remote_error(&status(403)), ErrorKind::Auth);
        assert_eq!(classify_remote_error(&status(302)), ErrorKind::Unknown);
    }

    #[test]
    fn bad_request_is_not_a_credential_problem() {
        let invalid = RemoteFailure::Status {
            status: 400,
            message: "INVALID_ARGUMENT: prompt was blocked".into(),
        };
        assert_eq!(classify_remote_error(&invalid), ErrorKind::Unknown);
        assert_eq!(classify_remote_error(&status(422)), ErrorKind::Unknown);

        let bad_key = RemoteFailure::Status {
            status: 400,
            message: "API key not valid. Please pass a valid API key.".into(),
        };
        assert_eq!(classify_remote_error(&bad_key), ErrorKind::Auth);

        let missing_model = RemoteFailure::Status {
            status: 404,
            message: "models/foo is not found: NOT_FOUND".into(),
        };
        assert_eq!(classify_remote_error(&missing_model), ErrorKind::Auth);
    }

    #[test]
    fn credential_messages_are_auth() {
        let failure = RemoteFailure::Status {
            status: 0,
            message: "API key not valid. Please pass a valid API key.".into(),
        };
        assert_eq!(classify_remote_error(&failure), ErrorKind::Auth);
    }

    #[test]
    fn transport_is_transient_and_decode_is_parse() {
        let transport = RemoteFailure::Transport {
            message: "connection reset".into(),
            timed_out: false,
        };
        assert_eq!(classify_remote_error(&transport), ErrorKind::Server);
        let decode = RemoteFailure::Decode {
            message: "expected value".into(),
        };
        assert_eq!(classify_remote_error(&decode), ErrorKind::Parse);
    }
}
