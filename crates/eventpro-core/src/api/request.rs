//! Request descriptors and normalized responses.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One logical API call.
///
/// `timeout` of `None` means the pipeline's configured default.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a caller header. Caller headers win over pipeline defaults.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Normalized response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ResponseData {
    Json(Value),
    Text(String),
    /// No body, or a JSON body that failed to parse.
    Empty,
}

impl ResponseData {
    /// Normalize a raw body according to its content type.
    ///
    /// JSON content that fails to parse yields `Empty` rather than an error.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Self {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);

        if is_json {
            match serde_json::from_slice(body) {
                Ok(value) => ResponseData::Json(value),
                Err(e) => {
                    if !body.is_empty() {
                        tracing::warn!(error = %e, "Failed to parse JSON response body");
                    }
                    ResponseData::Empty
                }
            }
        } else if body.is_empty() {
            ResponseData::Empty
        } else {
            ResponseData::Text(String::from_utf8_lossy(body).into_owned())
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseData::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub ok: bool,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    pub data: ResponseData,
}

impl ResponseEnvelope {
    pub fn new(status: u16, headers: BTreeMap<String, String>, data: ResponseData) -> Self {
        Self {
            status,
            ok: (200..300).contains(&status),
            headers,
            data,
        }
    }

    /// Deserialize the JSON payload into a wire record.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.data {
            ResponseData::Json(value) => T::deserialize(value),
            ResponseData::Text(_) | ResponseData::Empty => T::deserialize(&Value::Null),
        }
    }

    /// Human-readable error text: server `detail` or `message`, else status text.
    pub fn error_message(&self, status_text: &str) -> String {
        if let Some(value) = self.data.as_json() {
            for key in ["detail", "message"] {
                match value.get(key) {
                    Some(Value::String(text)) => return text.clone(),
                    Some(other) if !other.is_null() => return other.to_string(),
                    _ => {}
                }
            }
        }
        if let ResponseData::Text(text) = &self.data {
            if !text.trim().is_empty() {
                return text.clone();
            }
        }
        if status_text.is_empty() {
            format!("HTTP {}", self.status)
        } else {
            status_text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_builder() {
        let desc = RequestDescriptor::post("/events/")
            .json(json!({"nombre": "Workshop"}))
            .header("X-Trace", "abc")
            .timeout(Duration::from_secs(2));

        assert_eq!(desc.method, Method::Post);
        assert_eq!(desc.path, "/events/");
        assert_eq!(desc.headers, vec![("X-Trace".to_string(), "abc".to_string())]);
        assert_eq!(desc.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_json_body_is_parsed() {
        let data = ResponseData::from_body(Some("application/json; charset=utf-8"), br#"{"id": 1}"#);
        assert_eq!(data, ResponseData::Json(json!({"id": 1})));
    }

    #[test]
    fn test_malformed_json_becomes_empty() {
        let data = ResponseData::from_body(Some("application/json"), b"{not json");
        assert_eq!(data, ResponseData::Empty);
    }

    #[test]
    fn test_non_json_is_text() {
        let data = ResponseData::from_body(Some("text/plain"), b"pong");
        assert_eq!(data, ResponseData::Text("pong".to_string()));
        assert_eq!(ResponseData::from_body(None, b""), ResponseData::Empty);
    }

    #[test]
    fn test_envelope_ok_flag() {
        assert!(ResponseEnvelope::new(204, BTreeMap::new(), ResponseData::Empty).ok);
        assert!(!ResponseEnvelope::new(404, BTreeMap::new(), ResponseData::Empty).ok);
    }

    #[test]
    fn test_error_message_prefers_detail() {
        let env = ResponseEnvelope::new(
            400,
            BTreeMap::new(),
            ResponseData::Json(json!({"detail": "Ya existe un usuario con este email"})),
        );
        assert_eq!(env.error_message("Bad Request"), "Ya existe un usuario con este email");

        let env = ResponseEnvelope::new(500, BTreeMap::new(), ResponseData::Empty);
        assert_eq!(env.error_message("Internal Server Error"), "Internal Server Error");
        assert_eq!(env.error_message(""), "HTTP 500");
    }
}
