//! Transport seam between the session manager and the network.
//!
//! The session manager never opens sockets itself. Every token exchange
//! and API call goes through [`Transport::send`]; the default
//! implementation is [`HttpTransport`] on top of reqwest.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use super::config::ClientConfig;
use crate::{Error, Result};

/// Status and raw body of an HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text (possibly empty)
    pub body: String,
}

impl RawResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns its status and body.
///
/// Implementations report failures that produced no HTTP status
/// (connect, timeout, I/O) as [`Error::Transport`]. Any status, including
/// 4xx and 5xx, is a successful send.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `body` (JSON, if any) to `path` with the given headers.
    async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> Result<RawResponse>;
}

/// reqwest-backed [`Transport`] rooted at the API base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for `api_url` using the timeout and user agent
    /// from `config`. A trailing `/` on the URL is ignored.
    pub fn new(api_url: impl AsRef<str>, config: &ClientConfig) -> Result<Self> {
        let base_url = api_url.as_ref().trim().trim_end_matches('/').to_string();
        url::Url::parse(&base_url)?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> Result<RawResponse> {
        let url = self.url_for(path);
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self.http.request(method, &url).headers(headers);
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(format!("request to {url} failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("reading response from {url} failed: {e}")))?;

        debug!(url = %url, status, "Received response");
        Ok(RawResponse { status, body })
    }
}
