//! Request pipeline for the EventPro REST API.
//!
//! `RequestPipeline` turns one `RequestDescriptor` into zero or more network
//! attempts and a normalized `ResponseEnvelope` or classified `ApiError`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::clock::{Sleeper, TokioSleeper};
use crate::config::PortalConfig;

use super::mock::MockTable;
use super::request::{RequestDescriptor, ResponseData, ResponseEnvelope};
use super::retry::{retry, RetryPolicy};
use super::transport::{HttpTransport, PreparedRequest, RawResponse, Transport, TransportError};
use super::ApiError;

/// API request pipeline.
///
/// Holds the session store it reads credentials from and clears on 401.
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    sleeper: Arc<dyn Sleeper>,
    base_url: String,
    timeout: Duration,
    policy: RetryPolicy,
    mock_mode: bool,
    mocks: Arc<MockTable>,
    mock_latency: (Duration, Duration),
}

impl RequestPipeline {
    /// Create a pipeline over the real network.
    pub fn new(config: &PortalConfig, session: Arc<SessionStore>) -> anyhow::Result<Self> {
        let transport = Arc::new(HttpTransport::new()?);
        Ok(Self::with_parts(config, session, transport, Arc::new(TokioSleeper)))
    }

    /// Create a pipeline with explicit transport and sleeper.
    pub fn with_parts(
        config: &PortalConfig,
        session: Arc<SessionStore>,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            session,
            sleeper,
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
            policy: RetryPolicy::new(config.retry_attempts, config.retry_delay()),
            mock_mode: config.mock_mode,
            mocks: Arc::new(MockTable::new()),
            mock_latency: config.mock_latency(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use `table` for mock lookups. It is consulted only in mock mode.
    pub fn with_mock_table(mut self, table: Arc<MockTable>) -> Self {
        self.mocks = table;
        self
    }

    pub fn with_mock_mode(mut self, enabled: bool) -> Self {
        self.mock_mode = enabled;
        self
    }

    pub fn with_mock_latency(mut self, min: Duration, max: Duration) -> Self {
        self.mock_latency = (min.min(max), min.max(max));
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The mock table, for registering canned responses.
    pub fn mocks(&self) -> &Arc<MockTable> {
        &self.mocks
    }

    pub fn is_mock_mode(&self) -> bool {
        self.mock_mode
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute one logical call.
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<ResponseEnvelope, ApiError> {
        let prepared = self.prepare(&descriptor)?;

        if self.mock_mode {
            if let Some(mock) = self.mocks.lookup(descriptor.method, &descriptor.path) {
                let latency = self.pick_mock_latency();
                debug!(
                    method = %descriptor.method,
                    path = %descriptor.path,
                    latency_ms = latency.as_millis() as u64,
                    "Serving mock response"
                );
                self.sleeper.sleep(latency).await;
                return self.complete(mock.to_envelope(), "");
            }
        }

        let timeout = descriptor.timeout.unwrap_or(self.timeout);
        let prepared = &prepared;
        let this = self;
        retry(&self.policy, self.sleeper.as_ref(), move |attempt| {
            this.attempt(prepared, timeout, attempt)
        })
        .await
    }

    /// Execute a call and deserialize its JSON payload.
    pub async fn request_json<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, ApiError> {
        let path = descriptor.path.clone();
        let envelope = self.request(descriptor).await?;
        envelope
            .json()
            .map_err(|e| ApiError::Unknown(format!("Failed to parse JSON response from {}: {}", path, e)))
    }

    pub async fn get(&self, path: &str) -> Result<ResponseEnvelope, ApiError> {
        self.request(RequestDescriptor::get(path)).await
    }

    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<ResponseEnvelope, ApiError> {
        self.request(RequestDescriptor::post(path).json(to_json(body)?)).await
    }

    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<ResponseEnvelope, ApiError> {
        self.request(RequestDescriptor::put(path).json(to_json(body)?)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ResponseEnvelope, ApiError> {
        self.request(RequestDescriptor::delete(path)).await
    }

    async fn attempt(
        &self,
        request: &PreparedRequest,
        timeout: Duration,
        attempt: u32,
    ) -> Result<ResponseEnvelope, ApiError> {
        debug!(attempt, method = %request.method, url = %request.url, "Sending request");

        let raw = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Err(_) | Ok(Err(TransportError::Timeout)) => return Err(ApiError::Timeout(timeout)),
            Ok(Err(TransportError::Network(message))) => return Err(ApiError::NetworkFailure(message)),
            Ok(Ok(raw)) => raw,
        };

        let status_text = raw.status_text.clone();
        self.complete(normalize(raw), &status_text)
    }

    /// Classify a finished exchange. A 401 clears the session.
    fn complete(&self, envelope: ResponseEnvelope, status_text: &str) -> Result<ResponseEnvelope, ApiError> {
        if envelope.ok {
            return Ok(envelope);
        }

        let message = envelope.error_message(status_text);
        let body = envelope.data.as_json().cloned();
        let err = ApiError::from_status(envelope.status, &message, body);
        if matches!(err, ApiError::Unauthorized { .. }) {
            warn!("Received 401, clearing session");
            self.session.clear();
        }
        Err(err)
    }

    fn prepare(&self, descriptor: &RequestDescriptor) -> Result<PreparedRequest, ApiError> {
        if descriptor.path.trim().is_empty() {
            return Err(ApiError::InvalidRequest("empty request path".into()));
        }

        Ok(PreparedRequest {
            method: descriptor.method,
            url: self.build_url(&descriptor.path),
            headers: self.build_headers(descriptor)?,
            body: descriptor.body.clone(),
        })
    }

    /// Absolute URLs pass through; relative paths are joined to the base URL.
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// JSON content type, then session credentials, then caller headers.
    /// Later layers replace earlier ones on conflict.
    fn build_headers(&self, descriptor: &RequestDescriptor) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in self.session.auth_headers().iter() {
            headers.insert(name.clone(), value.clone());
        }

        for (name, value) in &descriptor.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidRequest(format!("invalid header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidRequest(format!("invalid value for header {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    fn pick_mock_latency(&self) -> Duration {
        let (min, max) = self.mock_latency;
        if min >= max {
            return min;
        }
        let ms = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
        Duration::from_millis(ms)
    }
}

fn to_json<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(format!("unserializable body: {}", e)))
}

fn normalize(raw: RawResponse) -> ResponseEnvelope {
    let content_type = raw
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in raw.headers.iter() {
        let Ok(value) = value.to_str() else { continue };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    let data = ResponseData::from_body(content_type.as_deref(), &raw.body);
    ResponseEnvelope::new(raw.status, headers, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiErrorKind, Method, MockResponse};
    use crate::auth::Session;
    use crate::clock::Clock;
    use crate::models::{Role, User};
    use crate::testing::{self, ManualClock, RecordingSleeper, Scripted, ScriptedTransport};
    use reqwest::header::AUTHORIZATION;
    use serde_json::json;

    fn demo_user() -> User {
        User {
            id: 7,
            name: "Ana Admin".into(),
            email: "admin@eventpro.com".into(),
            role: Role::Admin,
        }
    }

    struct Harness {
        transport: Arc<ScriptedTransport>,
        sleeper: Arc<RecordingSleeper>,
        clock: Arc<ManualClock>,
        store: Arc<SessionStore>,
        api: RequestPipeline,
    }

    fn harness() -> Harness {
        let transport = ScriptedTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        let clock = ManualClock::new();
        let store = testing::memory_store(clock.clone());
        let api = testing::pipeline(transport.clone(), store.clone(), sleeper.clone());
        Harness { transport, sleeper, clock, store, api }
    }

    fn logged_in(h: &Harness) -> Session {
        h.store.save(Session::new("tok-123", &demo_user(), h.clock.now()))
    }

    #[test]
    fn test_build_url() {
        let h = harness();
        assert_eq!(h.api.build_url("/events/"), "http://api.test/events/");
        assert_eq!(h.api.build_url("events"), "http://api.test/events");
        assert_eq!(h.api.build_url("https://other.test/x"), "https://other.test/x");
    }

    #[tokio::test]
    async fn test_success_returns_parsed_json() {
        let h = harness();
        h.transport.push_json(200, json!([{"id": 1}]));

        let env = h.api.get("/events/").await.expect("request should succeed");
        assert!(env.ok);
        assert_eq!(env.data, ResponseData::Json(json!([{"id": 1}])));
        assert_eq!(env.headers.get("content-type").map(String::as_str), Some("application/json"));
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_three_503s_exhaust_retries() {
        let h = harness();
        for _ in 0..3 {
            h.transport.push_status(503);
        }

        let err = h.api.get("/events/").await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::HttpServerError);
        assert_eq!(err.status(), Some(503));
        assert_eq!(h.transport.calls(), 3);
        assert_eq!(
            h.sleeper.recorded(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test]
    async fn test_400_is_not_retried() {
        let h = harness();
        h.transport.push_json(400, json!({"detail": "Los cupos deben ser mayor a 0"}));

        let err = h.api.post("/events/", &json!({"cupos": 0})).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::HttpClientError);
        assert_eq!(err.to_string(), "Request rejected (400): Los cupos deben ser mayor a 0");
        assert_eq!(h.transport.calls(), 1);
        assert!(h.sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_401_clears_session_without_retry() {
        let h = harness();
        logged_in(&h);
        h.transport.push_json(401, json!({"detail": "Token inválido"}));

        let err = h.api.get("/users/me").await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
        assert_eq!(h.transport.calls(), 1);
        assert!(h.store.current().is_none());
    }

    #[tokio::test]
    async fn test_network_failure_then_success() {
        let h = harness();
        h.transport.push_error(TransportError::Network("connection refused".into()));
        h.transport.push_json(200, json!({"ok": true}));

        let env = h.api.get("/dashboard/stats").await.expect("second attempt succeeds");
        assert_eq!(env.status, 200);
        assert_eq!(h.transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_attempt_timeout_is_retried_and_classified() {
        let h = harness();
        for _ in 0..3 {
            h.transport.push(Scripted::Hang);
        }

        let err = h
            .api
            .request(RequestDescriptor::get("/events/").timeout(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Timeout);
        assert_eq!(h.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_headers_merge_with_caller_precedence() {
        let h = harness();
        logged_in(&h);
        h.transport.push_status(204);
        h.transport.push_status(204);

        h.api.get("/users/me").await.expect("request should succeed");
        h.api
            .request(
                RequestDescriptor::get("/users/me")
                    .bearer("other-token")
                    .header("Content-Type", "text/plain"),
            )
            .await
            .expect("request should succeed");

        let requests = h.transport.requests();
        assert_eq!(requests[0].headers.get(AUTHORIZATION).unwrap(), "Bearer tok-123");
        assert_eq!(requests[0].headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(requests[1].headers.get(AUTHORIZATION).unwrap(), "Bearer other-token");
        assert_eq!(requests[1].headers.get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[tokio::test]
    async fn test_anonymous_requests_have_no_authorization() {
        let h = harness();
        h.transport.push_status(200);

        h.api.get("/events/").await.expect("request should succeed");
        assert!(h.transport.requests()[0].headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_invalid_header_is_programmer_error() {
        let h = harness();
        let err = h
            .api
            .request(RequestDescriptor::get("/events/").header("bad header", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::InvalidRequest);
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_json_yields_empty_data() {
        let h = harness();
        h.transport.push(Scripted::Respond(RawResponse {
            status: 200,
            status_text: "OK".into(),
            headers: {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                headers
            },
            body: b"{truncated".to_vec(),
        }));

        let env = h.api.get("/events/").await.expect("status decides success");
        assert!(env.ok);
        assert_eq!(env.data, ResponseData::Empty);
    }

    #[tokio::test]
    async fn test_mock_hit_skips_network() {
        let h = harness();
        let api = h
            .api
            .with_mock_mode(true)
            .with_mock_latency(Duration::from_millis(100), Duration::from_millis(300));
        api.mocks()
            .register(Method::Get, "/events", MockResponse::json(json!([{"id": 1}])));

        let env = api
            .request(RequestDescriptor::get("/events"))
            .await
            .expect("mock should answer");
        assert_eq!(env.data, ResponseData::Json(json!([{"id": 1}])));
        assert_eq!(h.transport.calls(), 0);

        let slept = h.sleeper.recorded();
        assert_eq!(slept.len(), 1);
        assert!(slept[0] >= Duration::from_millis(100) && slept[0] <= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_mock_miss_falls_through_to_network() {
        let h = harness();
        let api = h.api.with_mock_mode(true);
        api.mocks().register(Method::Get, "/events", MockResponse::json(json!([])));
        h.transport.push_json(200, json!({"id": 3}));

        let env = api.get("/events/3").await.expect("network should answer");
        assert_eq!(env.data, ResponseData::Json(json!({"id": 3})));
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_table_ignored_when_mock_mode_off() {
        let h = harness();
        h.api.mocks().register(Method::Get, "/events", MockResponse::json(json!([])));
        h.transport.push_json(200, json!(["live"]));

        let env = h.api.get("/events").await.expect("network should answer");
        assert_eq!(env.data, ResponseData::Json(json!(["live"])));
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_request_json_reports_shape_mismatch() {
        let h = harness();
        h.transport.push_json(200, json!({"unexpected": true}));

        let err = h
            .api
            .request_json::<Vec<u32>>(RequestDescriptor::get("/events/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unknown);
    }
}
