//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::api::transport::{PreparedRequest, RawResponse, Transport, TransportError};
use crate::api::{RequestPipeline, RetryPolicy};
use crate::auth::storage::MemoryStore;
use crate::auth::SessionStore;
use crate::clock::{Clock, Sleeper};
use crate::config::PortalConfig;

pub(crate) enum Scripted {
    Respond(RawResponse),
    Fail(TransportError),
    Hang,
    /// Stays pending until the sender delivers the response.
    Gated(oneshot::Receiver<RawResponse>),
}

/// Transport that replays a queue of scripted outcomes and records requests.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<PreparedRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push(&self, outcome: Scripted) {
        self.script.lock().push_back(outcome);
    }

    pub(crate) fn push_json(&self, status: u16, body: Value) {
        self.push(Scripted::Respond(json_response(status, body)));
    }

    pub(crate) fn push_status(&self, status: u16) {
        self.push(Scripted::Respond(RawResponse {
            status,
            status_text: String::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }));
    }

    pub(crate) fn push_error(&self, error: TransportError) {
        self.push(Scripted::Fail(error));
    }

    /// Queue a response that is held back until the returned sender fires.
    pub(crate) fn push_gated(&self) -> oneshot::Sender<RawResponse> {
        let (release, gate) = oneshot::channel();
        self.push(Scripted::Gated(gate));
        release
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub(crate) fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(&'a self, request: &'a PreparedRequest) -> BoxFuture<'a, Result<RawResponse, TransportError>> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();
        Box::pin(async move {
            match next {
                Some(Scripted::Respond(response)) => Ok(response),
                Some(Scripted::Fail(error)) => Err(error),
                Some(Scripted::Hang) => futures::future::pending().await,
                Some(Scripted::Gated(gate)) => gate
                    .await
                    .map_err(|_| TransportError::Network("gate dropped".into())),
                None => Err(TransportError::Network("script exhausted".into())),
            }
        })
    }
}

pub(crate) fn json_response(status: u16, body: Value) -> RawResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    RawResponse {
        status,
        status_text: String::new(),
        headers,
        body: body.to_string().into_bytes(),
    }
}

/// Sleeper that returns immediately and remembers what it was asked for.
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.slept.lock().push(duration);
        Box::pin(async {})
    }
}

/// Clock that only moves when told to.
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new() -> Arc<Self> {
        let start = Utc
            .with_ymd_and_hms(2025, 7, 1, 9, 0, 0)
            .single()
            .expect("valid fixed timestamp");
        Arc::new(Self { now: Mutex::new(start) })
    }

    pub(crate) fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub(crate) fn memory_store(clock: Arc<ManualClock>) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(
        Box::new(MemoryStore::new()),
        chrono::Duration::hours(24),
        clock,
    ))
}

/// Pipeline over a scripted transport with instant sleeps.
pub(crate) fn pipeline(
    transport: Arc<ScriptedTransport>,
    session: Arc<SessionStore>,
    sleeper: Arc<RecordingSleeper>,
) -> RequestPipeline {
    let config = PortalConfig {
        base_url: "http://api.test".to_string(),
        ..PortalConfig::default()
    };
    RequestPipeline::with_parts(&config, session, transport, sleeper)
        .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1000)))
}
