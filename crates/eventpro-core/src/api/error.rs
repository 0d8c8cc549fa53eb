use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Classified failure of a logical API call.
///
/// Every failure the pipeline sees lands in exactly one variant.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Network error: {0}")]
    NetworkFailure(String),

    #[error("Request rejected ({status}): {message}")]
    HttpClientError {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    #[error("Server error ({status}): {message}")]
    HttpServerError {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    #[error("Unauthorized - session is no longer valid: {message}")]
    Unauthorized { message: String, body: Option<Value> },

    #[error("Unexpected response: {0}")]
    Unknown(String),

    /// A malformed descriptor. This is a programming error, not an HTTP outcome.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    Timeout,
    NetworkFailure,
    HttpClientError,
    HttpServerError,
    Unauthorized,
    Unknown,
    InvalidRequest,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Classify a non-success HTTP status.
    ///
    /// `message` is the best human-readable text available (server `detail` /
    /// `message` field, else the status text); `body` is the parsed JSON body.
    pub fn from_status(status: u16, message: &str, body: Option<Value>) -> Self {
        let message = Self::truncate_body(message);
        match status {
            401 => ApiError::Unauthorized { message, body },
            400..=499 => ApiError::HttpClientError { status, message, body },
            0 | 500..=599 => ApiError::HttpServerError { status, message, body },
            _ => ApiError::Unknown(format!("Status {}: {}", status, message)),
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Timeout(_) => ApiErrorKind::Timeout,
            ApiError::NetworkFailure(_) => ApiErrorKind::NetworkFailure,
            ApiError::HttpClientError { .. } => ApiErrorKind::HttpClientError,
            ApiError::HttpServerError { .. } => ApiErrorKind::HttpServerError,
            ApiError::Unauthorized { .. } => ApiErrorKind::Unauthorized,
            ApiError::Unknown(_) => ApiErrorKind::Unknown,
            ApiError::InvalidRequest(_) => ApiErrorKind::InvalidRequest,
        }
    }

    /// Whether another attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_) | ApiError::NetworkFailure(_) | ApiError::HttpServerError { .. }
        )
    }

    /// HTTP status for errors that came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpClientError { status, .. } | ApiError::HttpServerError { status, .. } => {
                Some(*status)
            }
            ApiError::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// Parsed response body, when the server sent JSON.
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::HttpClientError { body, .. }
            | ApiError::HttpServerError { body, .. }
            | ApiError::Unauthorized { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_status_classification() {
        assert_eq!(ApiError::from_status(401, "nope", None).kind(), ApiErrorKind::Unauthorized);
        assert_eq!(ApiError::from_status(400, "bad", None).kind(), ApiErrorKind::HttpClientError);
        assert_eq!(ApiError::from_status(404, "missing", None).kind(), ApiErrorKind::HttpClientError);
        assert_eq!(ApiError::from_status(503, "down", None).kind(), ApiErrorKind::HttpServerError);
        assert_eq!(ApiError::from_status(0, "no status", None).kind(), ApiErrorKind::HttpServerError);
        assert_eq!(ApiError::from_status(302, "moved", None).kind(), ApiErrorKind::Unknown);
    }

    #[test]
    fn test_retryable_split() {
        assert!(ApiError::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(ApiError::NetworkFailure("reset".into()).is_retryable());
        assert!(ApiError::from_status(500, "boom", None).is_retryable());
        assert!(!ApiError::from_status(422, "invalid", None).is_retryable());
        assert!(!ApiError::from_status(401, "expired", None).is_retryable());
        assert!(!ApiError::Unknown("odd".into()).is_retryable());
    }

    #[test]
    fn test_status_and_body_accessors() {
        let err = ApiError::from_status(409, "taken", Some(json!({"detail": "taken"})));
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.body(), Some(&json!({"detail": "taken"})));
        assert_eq!(ApiError::NetworkFailure("x".into()).status(), None);
    }

    #[test]
    fn test_truncate_body() {
        let short = "short body";
        assert_eq!(ApiError::truncate_body(short), short);

        let long = "é".repeat(400);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
    }
}
