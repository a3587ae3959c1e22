use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// No response was received. Never retried.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Login or registration rejected by the server
    #[error("{0}")]
    Auth(String),

    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Refresh failed or the resent call was rejected again. Stored
    /// credentials have been cleared; the user has to log in again.
    #[error("Session expired - please log in again")]
    SessionExpired,

    /// Any non-2xx status other than 401, passed through as received.
    /// `body` is complete; only the message shortens it.
    #[error("Server returned {status}: {}", truncate_body(.body))]
    Upstream { status: StatusCode, body: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Fallback message when the server gives no `detail`
pub const GENERIC_AUTH_ERROR: &str = "An error occurred. Please try again.";

/// Shorten a response body for messages and logs
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..end],
            body.len()
        )
    }
}

impl ClientError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        ClientError::Upstream {
            status,
            body: body.to_string(),
        }
    }

    /// Status code of an upstream failure, if this is one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Upstream { status, .. } => Some(*status),
            ClientError::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Whether the caller must send the user back to login
    pub fn requires_login(&self) -> bool {
        matches!(self, ClientError::SessionExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_keeps_status_and_body() {
        let err = ClientError::from_status(StatusCode::FORBIDDEN, "nope");
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(!err.requires_login());
        assert_eq!(err.to_string(), "Server returned 403 Forbidden: nope");
    }

    #[test]
    fn test_long_bodies_kept_whole_but_shortened_in_message() {
        let body = "é".repeat(400);
        let err = ClientError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(err.to_string().contains("truncated, 800 total bytes"));
        match err {
            ClientError::Upstream { body: kept, .. } => assert_eq!(kept, body),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_session_expired_requires_login() {
        assert!(ClientError::SessionExpired.requires_login());
        assert!(!ClientError::PasswordMismatch.requires_login());
    }
}
