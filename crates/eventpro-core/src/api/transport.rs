//! The network seam under the pipeline.
//!
//! `Transport` performs exactly one HTTP exchange. Retries, timeouts and
//! classification live above it in `RequestPipeline`.

use futures::future::BoxFuture;
use reqwest::{header::HeaderMap, Client};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::request::Method;

/// A fully built request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out")]
    Timeout,

    /// No response reached us: DNS, connect, reset, TLS.
    #[error("{0}")]
    Network(String),
}

pub trait Transport: Send + Sync {
    fn send<'a>(&'a self, request: &'a PreparedRequest) -> BoxFuture<'a, Result<RawResponse, TransportError>>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn execute(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .headers(request.headers.clone());
        if let Some(ref body) = request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        debug!(url = %request.url, status = status.as_u16(), bytes = body.len(), "Response received");

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: body.to_vec(),
        })
    }
}

impl Transport for HttpTransport {
    fn send<'a>(&'a self, request: &'a PreparedRequest) -> BoxFuture<'a, Result<RawResponse, TransportError>> {
        Box::pin(self.execute(request))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}
