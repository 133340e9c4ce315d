use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use tracing::trace;

use super::WebhookPayload;
use crate::errors::{AppError, AppResult};

/// Status and body of one answered webhook request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Performs a single webhook POST. Retrying is the caller's job.
///
/// Any HTTP status is an `Ok` response; `Err` means no status was obtained
/// (connection refused, timeout, invalid header).
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn send(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        payload: &WebhookPayload,
    ) -> AppResult<TransportResponse>;
}

/// Response bytes read when no other limit is set.
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// reqwest-backed transport shared by every destination.
///
/// Only the first `body_limit` bytes of a response body are read; the rest
/// is dropped with the connection.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
    body_limit: usize,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> AppResult<Self> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .tcp_keepalive(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(90));

        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::config_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            timeout,
            body_limit: DEFAULT_BODY_LIMIT,
        })
    }

    /// Read at most `bytes` of each response body.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    fn build_headers(headers: &BTreeMap<String, String>) -> AppResult<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::validation(format!("header '{name}'"), e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::validation(format!("header '{name}'"), e.to_string()))?;
            map.insert(name, value);
        }
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(map)
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn send(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        payload: &WebhookPayload,
    ) -> AppResult<TransportResponse> {
        let headers = Self::build_headers(headers)?;

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::NetworkTimeout {
                        timeout_secs: self.timeout.as_secs(),
                    }
                } else {
                    AppError::HttpRequest {
                        method: "POST".to_string(),
                        url: url.to_string(),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let body = match read_body_prefix(response, self.body_limit).await {
            Ok(body) => body,
            Err(e) => {
                trace!("Could not read response body from {}: {}", url, e);
                String::new()
            }
        };

        Ok(TransportResponse { status, body })
    }
}

async fn read_body_prefix(mut response: Response, limit: usize) -> reqwest::Result<String> {
    let mut buf = Vec::new();
    while buf.len() < limit {
        let Some(chunk) = response.chunk().await? else {
            break;
        };
        let take = chunk.len().min(limit - buf.len());
        buf.extend_from_slice(&chunk[..take]);
    }
    Ok(utf8_prefix(buf))
}

/// Decode `bytes`, dropping a character cut off at the end.
fn utf8_prefix(mut bytes: Vec<u8>) -> String {
    if let Err(e) = std::str::from_utf8(&bytes) {
        if e.error_len().is_none() {
            bytes.truncate(e.valid_up_to());
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
