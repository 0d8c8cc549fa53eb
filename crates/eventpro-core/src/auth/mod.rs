//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: the persisted session with lazy expiry, login,
//!   registration, logout and token refresh
//! - `KeyValueStore` backends: a durable file store and a volatile mirror
//!
//! Sessions are persisted to disk and expire after the configured lifetime.

pub mod error;
pub mod flows;
pub mod refresh;
pub mod session;
pub mod storage;

pub use error::AuthError;
pub use flows::{Credentials, NewAccount, RefreshOutcome};
pub use refresh::RefreshTask;
pub use session::{Session, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
