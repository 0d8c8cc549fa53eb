//! Core library for the EventPro portal client.
//!
//! - `api`: the request pipeline (`RequestPipeline`), its retry policy,
//!   transport seam, mock table and the typed portal endpoints
//! - `auth`: the session store, its storage backends and login/refresh flows
//! - `models`: portal data models and the adapters from the wire schema
//! - `config`: externally supplied settings
//! - `clock`: time and sleep seams used by the session store and retries
//!
//! `SessionStore` and `RequestPipeline` are constructed explicitly and shared
//! by `Arc`; nothing in this crate is a global.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod models;

#[cfg(test)]
mod testing;

pub use api::{
    ApiError, ApiErrorKind, Method, MockResponse, MockTable, RequestDescriptor, RequestPipeline,
    ResponseData, ResponseEnvelope, RetryPolicy,
};
pub use auth::{AuthError, Credentials, NewAccount, RefreshOutcome, RefreshTask, Session, SessionStore};
pub use clock::{Clock, Sleeper, SystemClock, TokioSleeper};
pub use config::PortalConfig;
pub use models::Role;
