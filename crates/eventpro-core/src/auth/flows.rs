//! Network-backed session operations: login, registration, verification and
//! token refresh.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::api::{RequestDescriptor, RequestPipeline};
use crate::models::{Role, User, UserRecord};

use super::{AuthError, Session, SessionStore};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const REFRESH_PATH: &str = "/auth/refresh";
const VERIFY_PATH: &str = "/auth/verify";
const PROFILE_PATH: &str = "/users/me";

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Account details for registration.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    role: &'static str,
}

/// Response of the login and refresh endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<UserRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    NoSession,
    NotDue,
    Refreshed(Session),
    /// The refresh failed and the session was dropped.
    Cleared,
}

impl SessionStore {
    /// Authenticate and store the resulting session.
    pub async fn login(&self, api: &RequestPipeline, credentials: &Credentials) -> Result<Session, AuthError> {
        let _guard = self.lifecycle.lock().await;
        self.login_locked(api, credentials).await
    }

    /// Create an account, then log into it.
    pub async fn register(&self, api: &RequestPipeline, account: &NewAccount) -> Result<Session, AuthError> {
        if account.name.trim().is_empty() {
            return Err(AuthError::InvalidCredentials("Name is required".into()));
        }
        let _guard = self.lifecycle.lock().await;

        let body = RegisterRequest {
            name: &account.name,
            email: &account.email,
            password: &account.password,
            role: account.role.as_wire(),
        };
        let response = api.post(REGISTER_PATH, &body).await.map_err(|e| {
            warn!(error = %e, email = %account.email, "Registration failed");
            AuthError::from(e)
        })?;
        debug!(status = response.status, "Account created");

        let credentials = Credentials::new(account.email.clone(), account.password.clone());
        self.login_locked(api, &credentials).await
    }

    /// Ask the server whether the current token is still accepted.
    ///
    /// Any HTTP error response clears the session; an unreachable server
    /// leaves it.
    pub async fn verify(&self, api: &RequestPipeline) -> bool {
        if self.current().is_none() {
            return false;
        }
        match api.get(VERIFY_PATH).await {
            Ok(_) => true,
            Err(e) if e.status().is_some() => {
                warn!(error = %e, "Token rejected by server");
                self.clear();
                false
            }
            Err(e) => {
                warn!(error = %e, "Could not verify token");
                false
            }
        }
    }

    /// Refresh the token when it expires within `threshold`.
    ///
    /// A failed refresh clears the session so the user logs in again.
    pub async fn refresh_if_near_expiry(&self, api: &RequestPipeline, threshold: Duration) -> RefreshOutcome {
        let _guard = self.lifecycle.lock().await;

        let Some(session) = self.current() else {
            return RefreshOutcome::NoSession;
        };
        let now = self.clock.now();
        if !session.needs_refresh(now, threshold) {
            return RefreshOutcome::NotDue;
        }

        info!(
            user_id = session.user_id,
            minutes_left = session.minutes_until_expiry(now),
            "Session near expiry, refreshing"
        );

        let request = RequestDescriptor::post(REFRESH_PATH).bearer(&session.token);
        let tokens = match api.request(request).await {
            Ok(envelope) => envelope.json::<TokenResponse>().map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match tokens {
            Ok(tokens) => {
                let user = tokens.user.map(User::from).unwrap_or_else(|| session.user());
                let refreshed = self.save(Session::new(tokens.access_token, &user, self.clock.now()));
                info!(expires_at = %refreshed.expires_at, "Session refreshed");
                RefreshOutcome::Refreshed(refreshed)
            }
            Err(e) => {
                error!(error = %e, "Token refresh failed, clearing session");
                self.clear();
                RefreshOutcome::Cleared
            }
        }
    }

    async fn login_locked(&self, api: &RequestPipeline, credentials: &Credentials) -> Result<Session, AuthError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::InvalidCredentials("Email and password required".into()));
        }

        let envelope = api.post(LOGIN_PATH, credentials).await.map_err(|e| {
            warn!(error = %e, email = %credentials.email, "Login failed");
            AuthError::from(e)
        })?;
        let tokens: TokenResponse = envelope
            .json()
            .map_err(|e| AuthError::ServerError(format!("Malformed login response: {}", e)))?;
        if let Some(expires_in) = tokens.expires_in {
            debug!(expires_in, "Server token lifetime (local lifetime applies)");
        }

        let user = match tokens.user {
            Some(record) => User::from(record),
            None => self.fetch_profile(api, &tokens.access_token).await?,
        };

        let session = self.save(Session::new(tokens.access_token, &user, self.clock.now()));
        info!(user_id = session.user_id, role = %session.role, "Login successful");
        Ok(session)
    }

    /// Load the profile with a token that is not stored yet.
    async fn fetch_profile(&self, api: &RequestPipeline, token: &str) -> Result<User, AuthError> {
        let record: UserRecord = api
            .request_json(RequestDescriptor::get(PROFILE_PATH).bearer(token))
            .await
            .map_err(AuthError::from)?;
        Ok(record.into())
    }
}
