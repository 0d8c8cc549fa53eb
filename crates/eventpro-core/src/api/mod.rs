//! REST API module for the EventPro portal.
//!
//! This module provides the `RequestPipeline` for communicating with the
//! portal backend: header construction, per-attempt timeouts, linear-backoff
//! retries, response normalization and the optional mock table. Typed portal
//! calls (events, categories, profile, dashboard) live in `portal`.
//!
//! Authenticated calls carry `Authorization: Bearer <token>` taken from the
//! `SessionStore` the pipeline was built with.

pub mod client;
pub mod error;
pub mod mock;
pub mod portal;
pub mod request;
pub mod retry;
pub mod transport;

pub use client::RequestPipeline;
pub use error::{ApiError, ApiErrorKind};
pub use mock::{MockResponse, MockTable};
pub use request::{Method, RequestDescriptor, ResponseData, ResponseEnvelope};
pub use retry::{retry, RetryPolicy, Retryable};
pub use transport::{HttpTransport, PreparedRequest, RawResponse, Transport, TransportError};
