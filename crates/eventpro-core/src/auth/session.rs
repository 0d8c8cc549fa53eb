use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{PortalConfig, MAX_DURATION_SECS};
use crate::models::{Role, User};

use super::storage::{FileStore, KeyValueStore, MemoryStore, SessionVault};

/// Storage key for the session blob.
const SESSION_KEY: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session issued at `issued_at`. `SessionStore::save` assigns the
    /// expiry from the configured lifetime.
    pub fn new(token: impl Into<String>, user: &User, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            user_id: user.id,
            display_name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            issued_at,
            expires_at: issued_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    /// Check if the session will expire within `threshold`
    pub fn needs_refresh(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.time_until_expiry(now) < threshold
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        self.time_until_expiry(now).num_minutes().max(0)
    }

    pub fn user(&self) -> User {
        User {
            id: self.user_id,
            name: self.display_name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    fn is_complete(&self) -> bool {
        !self.token.trim().is_empty() && self.expires_at > self.issued_at
    }
}

/// Single source of truth for the logged-in user and their credential.
///
/// Storage access is serialized by `vault`. Operations that span a network
/// call (`login`, `register`, `logout`, refresh) also hold `lifecycle`, so a
/// background refresh never interleaves with an explicit login or logout.
pub struct SessionStore {
    vault: Mutex<SessionVault>,
    pub(super) lifecycle: tokio::sync::Mutex<()>,
    lifetime: Duration,
    pub(super) clock: Arc<dyn Clock>,
}

impl SessionStore {
    /// `lifetime` is clamped to zero..=ten years.
    pub fn new(durable: Box<dyn KeyValueStore>, lifetime: Duration, clock: Arc<dyn Clock>) -> Self {
        let max = Duration::seconds(MAX_DURATION_SECS as i64);
        if lifetime > max {
            warn!(lifetime_secs = lifetime.num_seconds(), "Session lifetime too long, clamping");
        }
        let lifetime = lifetime.clamp(Duration::zero(), max);
        Self {
            vault: Mutex::new(SessionVault::new(durable)),
            lifecycle: tokio::sync::Mutex::new(()),
            lifetime,
            clock,
        }
    }

    /// Store persisted under the configured cache directory.
    pub fn open(config: &PortalConfig) -> Result<Self> {
        let dir = config.cache_dir()?;
        debug!(?dir, "Session directory configured");
        Ok(Self::new(
            Box::new(FileStore::new(dir)),
            config.session_lifetime(),
            Arc::new(SystemClock),
        ))
    }

    /// Store with no durable copy; sessions end with the process.
    pub fn in_memory(lifetime: Duration) -> Self {
        Self::new(Box::new(MemoryStore::new()), lifetime, Arc::new(SystemClock))
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Persist `session`, replacing any prior one.
    ///
    /// The expiry is recomputed as `issued_at + lifetime`; the stored session
    /// is returned.
    pub fn save(&self, mut session: Session) -> Session {
        session.expires_at = match session.issued_at.checked_add_signed(self.lifetime) {
            Some(expires_at) => expires_at,
            None => {
                // Leaves the session incomplete, so `current` will not return it
                warn!(issued_at = %session.issued_at, "Session expiry out of range");
                session.issued_at
            }
        };
        match serde_json::to_string(&session) {
            Ok(blob) => {
                self.vault.lock().write(SESSION_KEY, &blob);
                debug!(user_id = session.user_id, expires_at = %session.expires_at, "Session saved");
            }
            Err(e) => warn!(error = %e, "Failed to serialize session"),
        }
        session
    }

    /// The active session, if any.
    ///
    /// Expired and unreadable sessions are cleared as a side effect.
    pub fn current(&self) -> Option<Session> {
        let vault = self.vault.lock();
        let blob = vault.read(SESSION_KEY)?;

        let session = match serde_json::from_str::<Session>(&blob) {
            Ok(session) if session.is_complete() => session,
            Ok(_) => {
                warn!("Persisted session is incomplete, clearing");
                vault.erase(SESSION_KEY);
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Persisted session is corrupt, clearing");
                vault.erase(SESSION_KEY);
                return None;
            }
        };

        if session.is_expired_at(self.clock.now()) {
            info!(user_id = session.user_id, "Session expired");
            vault.erase(SESSION_KEY);
            return None;
        }

        Some(session)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Get the bearer token if session is valid
    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    /// Headers to attach to outgoing requests; empty when logged out.
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(session) = self.current() {
            match HeaderValue::from_str(&format!("Bearer {}", session.token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => warn!(error = %e, "Session token is not a valid header value"),
            }
        }
        headers
    }

    /// Remove the session. Idempotent.
    pub fn clear(&self) {
        self.vault.lock().erase(SESSION_KEY);
        debug!("Session cleared");
    }

    /// Explicit logout. Waits for any in-flight login or refresh.
    pub async fn logout(&self) {
        let _guard = self.lifecycle.lock().await;
        self.clear();
        info!("Logged out");
    }

    /// Write a raw blob under the session key (tests only).
    #[cfg(test)]
    pub(crate) fn write_raw(&self, blob: &str) {
        self.vault.lock().write(SESSION_KEY, blob);
    }
}
