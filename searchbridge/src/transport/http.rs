//! reqwest-backed transport

use super::{HttpMethod, RequestBody, Transport, WireRequest, WireResponse};
use crate::config::ClientConfig;
use crate::{Error, Result, TransportError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::Value;

/// Talks to one cluster endpoint over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Post => Method::POST,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_decode() || err.is_body() {
        TransportError::MalformedResponse(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &WireRequest) -> std::result::Result<WireResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(Self::method(request.method), &url)
            .query(&request.params);

        if !matches!(request.body, RequestBody::Empty) {
            let payload = request
                .body
                .to_bytes()
                .map_err(|e| TransportError::MalformedResponse(format!("cannot encode request: {}", e)))?;
            if let Some(content_type) = request.body.content_type() {
                builder = builder.header(CONTENT_TYPE, content_type);
            }
            builder = builder.body(payload);
        }

        tracing::debug!("-> {}", request);
        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(classify)?;
        tracing::debug!("<- {} ({} bytes) for {}", status, bytes.len(), request);

        let body = if bytes.is_empty() || request.method == HttpMethod::Head {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                TransportError::MalformedResponse(format!(
                    "status {} with non-JSON body for {}: {}",
                    status, request, e
                ))
            })?
        };

        Ok(WireResponse::new(status, body))
    }
}
