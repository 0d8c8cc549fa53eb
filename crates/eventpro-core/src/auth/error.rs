use thiserror::Error;

use crate::api::ApiError;

/// Expected login/registration failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Unable to reach server: {0}")]
    NetworkError(String),
}

impl AuthError {
    /// Short message suitable for showing next to a login form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials(detail) if !detail.is_empty() => detail.clone(),
            AuthError::InvalidCredentials(_) => "Invalid email or password".to_string(),
            AuthError::ServerError(_) => "The server could not complete the request. Please try again.".to_string(),
            AuthError::NetworkError(_) => "Unable to connect to server. Check your internet connection.".to_string(),
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized { message, .. } | ApiError::HttpClientError { message, .. } => {
                AuthError::InvalidCredentials(message)
            }
            ApiError::InvalidRequest(message) => AuthError::InvalidCredentials(message),
            ApiError::Timeout(_) | ApiError::NetworkFailure(_) => AuthError::NetworkError(err.to_string()),
            ApiError::HttpServerError { .. } | ApiError::Unknown(_) => AuthError::ServerError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_api_error_mapping() {
        assert!(matches!(
            AuthError::from(ApiError::from_status(401, "Email o contraseña incorrectos", None)),
            AuthError::InvalidCredentials(m) if m == "Email o contraseña incorrectos"
        ));
        assert!(matches!(
            AuthError::from(ApiError::from_status(422, "invalid email", None)),
            AuthError::InvalidCredentials(_)
        ));
        assert!(matches!(
            AuthError::from(ApiError::from_status(502, "bad gateway", None)),
            AuthError::ServerError(_)
        ));
        assert!(matches!(
            AuthError::from(ApiError::Timeout(Duration::from_secs(10))),
            AuthError::NetworkError(_)
        ));
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            AuthError::InvalidCredentials(String::new()).user_message(),
            "Invalid email or password"
        );
        assert!(AuthError::NetworkError("x".into()).user_message().contains("internet"));
    }
}
