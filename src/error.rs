use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Outcomes of the credential lifecycle as seen by every consumer of a token.
///
/// No raw transport or provider error crosses the session boundary; they are
/// folded into one of these variants first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Session expired - please sign in again")]
    SessionExpired,

    #[error("Token refresh temporarily unavailable - try again")]
    RefreshTemporarilyUnavailable,

    #[error("Sign-in failed: {0}")]
    SignInFailed(String),
}

impl SessionError {
    /// Whether the user has to go through the authorization flow again.
    pub fn requires_sign_in(&self) -> bool {
        !matches!(self, SessionError::RefreshTemporarilyUnavailable)
    }
}

/// Failure of a single refresh exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// Refresh token revoked, expired or unknown. Terminal.
    #[error("Refresh rejected by provider: {0}")]
    Rejected(String),

    /// Network failure, timeout or provider outage. Retryable.
    #[error("Refresh unavailable: {0}")]
    Unavailable(String),
}

/// Failure of the authorization-code exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Authorization grant rejected: {0}")]
    Rejected(String),

    #[error("Token endpoint unavailable: {0}")]
    Unavailable(String),
}

/// Errors of the provider REST gateway, layered on top of [`SessionError`].
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Unauthorized - provider rejected the access token")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Server error: {0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
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

    pub fn from_status(status: StatusCode, body: &str, retry_after: Option<Duration>) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited { retry_after },
            500..=599 => ApiError::Server(format!("Status {}: {}", status, truncated)),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Whether repeating the same call later may succeed without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_)
                | ApiError::Server(_)
                | ApiError::RateLimited { .. }
                | ApiError::Session(SessionError::RefreshTemporarilyUnavailable)
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Cannot prepare configuration directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot load .env file: {0}")]
    Env(String),

    #[error("Cannot build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Credential cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential cache is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "", None),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "premium required", None),
            ApiError::Forbidden(msg) if msg == "premium required"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "", Some(Duration::from_secs(3))),
            ApiError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(3)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, "", None),
            ApiError::Server(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, "", None),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2_000);
        match ApiError::from_status(StatusCode::NOT_FOUND, &body, None) {
            ApiError::NotFound(msg) => {
                assert!(msg.len() < 600);
                assert!(msg.contains("2000 total bytes"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn retryable_classification() {
        assert!(ApiError::Server("x".into()).is_retryable());
        assert!(ApiError::from(SessionError::RefreshTemporarilyUnavailable).is_retryable());
        assert!(!ApiError::from(SessionError::SessionExpired).is_retryable());
        assert!(!ApiError::Forbidden("x".into()).is_retryable());
    }

    #[test]
    fn only_transient_refresh_failure_keeps_the_session() {
        assert!(SessionError::NotAuthenticated.requires_sign_in());
        assert!(SessionError::SessionExpired.requires_sign_in());
        assert!(!SessionError::RefreshTemporarilyUnavailable.requires_sign_in());
    }
}
