//! Wire requests and the transport collaborator
//!
//! Works render themselves into a [`WireRequest`] and decode a
//! [`WireResponse`]; a [`Transport`] moves bytes between the two. HTTP status
//! codes always come back as a response: only failures to get a usable
//! answer at all become a [`TransportError`].

mod http;

pub use http::HttpTransport;

use crate::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Put,
    Post,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Head => write!(f, "HEAD"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// Request payload: nothing, one JSON tree, or newline-delimited JSON lines.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    NdJson(Vec<Value>),
}

impl RequestBody {
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Json(_) => Some("application/json"),
            RequestBody::NdJson(_) => Some("application/x-ndjson"),
        }
    }

    /// Serialized payload. NDJSON ends with the newline the bulk API requires.
    pub fn to_bytes(&self) -> serde_json::Result<Bytes> {
        match self {
            RequestBody::Empty => Ok(Bytes::new()),
            RequestBody::Json(value) => Ok(Bytes::from(serde_json::to_vec(value)?)),
            RequestBody::NdJson(lines) => {
                let mut buf = Vec::new();
                for line in lines {
                    serde_json::to_writer(&mut buf, line)?;
                    buf.push(b'\n');
                }
                Ok(Bytes::from(buf))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: RequestBody,
}

impl WireRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn ndjson(mut self, lines: Vec<Value>) -> Self {
        self.body = RequestBody::NdJson(lines);
        self
    }

    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for WireRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            write!(f, "{}{}={}", if i == 0 { '?' } else { '&' }, k, v)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    pub status: u16,
    pub body: Value,
}

impl WireResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `(type, reason)` of an engine error body.
    ///
    /// Old engines answer with `"error": "<text>"` instead of an object.
    pub fn error_details(&self) -> (String, String) {
        error_details(&self.body)
    }
}

/// `(type, reason)` of an `error` member, tolerant of both error shapes.
pub fn error_details(body: &Value) -> (String, String) {
    match body.get("error") {
        Some(Value::Object(error)) => (
            error
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            error
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("no reason given")
                .to_string(),
        ),
        Some(Value::String(reason)) => ("unknown".to_string(), reason.clone()),
        _ => ("unknown".to_string(), body.to_string()),
    }
}

/// Sends rendered requests to the cluster.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ndjson_body_ends_with_newline() {
        let body = RequestBody::NdJson(vec![
            json!({"index": {"_id": "1"}}),
            json!({"title": "Dune"}),
        ]);
        let bytes = body.to_bytes().unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "{\"index\":{\"_id\":\"1\"}}\n{\"title\":\"Dune\"}\n"
        );
        assert_eq!(body.content_type(), Some("application/x-ndjson"));
    }

    #[test]
    fn test_error_details_both_shapes() {
        let modern = WireResponse::new(
            400,
            json!({"error": {"type": "resource_already_exists_exception", "reason": "exists"}}),
        );
        assert_eq!(
            modern.error_details(),
            ("resource_already_exists_exception".into(), "exists".into())
        );

        let legacy = WireResponse::new(404, json!({"error": "IndexMissingException[[x] missing]"}));
        assert_eq!(legacy.error_details().1, "IndexMissingException[[x] missing]");
    }

    #[test]
    fn test_display() {
        let request = WireRequest::new(HttpMethod::Post, "/_bulk").param("refresh", "true");
        assert_eq!(request.to_string(), "POST /_bulk?refresh=true");
    }
}
