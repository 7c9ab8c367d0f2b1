//! Authenticated transport to the OPNsense management API
//!
//! No business logic lives here: build the request, send it, hand back the
//! raw body or classify the failure.

use autodns_core::{Error, Result};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::Serialize;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP methods the management API is called with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
}

impl ApiMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            ApiMethod::Get => reqwest::Method::GET,
            ApiMethod::Post => reqwest::Method::POST,
        }
    }
}

/// OPNsense API client
///
/// Stateless per call. One instance is shared by every hostname and every
/// pass, TLS settings included.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the credentials.
#[derive(Clone)]
pub struct OpnsenseClient {
    /// Scheme and authority every path is appended to
    base_url: String,

    /// API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API secret
    /// ⚠️ NEVER log this value
    api_secret: String,

    /// HTTP client for API requests
    http: reqwest::Client,
}

impl std::fmt::Debug for OpnsenseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpnsenseClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<REDACTED>")
            .field("api_secret", &"<REDACTED>")
            .finish()
    }
}

impl OpnsenseClient {
    /// Create a client for `https://{host}`
    ///
    /// With `ignore_cert` the appliance's certificate is not verified, which
    /// is what self-signed on-premise firewalls usually need.
    pub fn new(
        host: &str,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        ignore_cert: bool,
    ) -> Result<Self> {
        Self::with_base_url(format!("https://{}", host), api_key, api_secret, ignore_cert)
    }

    /// Create a client for an explicit base URL (scheme included)
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        ignore_cert: bool,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::info!(base_url = %base_url, ignore_cert, "Creating new API client");

        if ignore_cert {
            tracing::warn!("TLS certificate verification disabled");
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .danger_accept_invalid_certs(ignore_cert)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            http,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `Basic base64(key:secret)`
    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.api_key, self.api_secret);
        format!("Basic {}", BASE64.encode(credentials))
    }

    /// GET `path`
    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.request::<()>(ApiMethod::Get, path, None).await
    }

    /// POST `body` as JSON to `path`
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Vec<u8>> {
        self.request(ApiMethod::Post, path, Some(body)).await
    }

    /// Send one request and return the raw response body
    ///
    /// # Errors
    ///
    /// - [`Error::Connectivity`] when the appliance cannot be reached or the
    ///   body cannot be read
    /// - [`Error::Transport`] for any non-2xx status, with the raw body
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: ApiMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(?method, url = %url, "Making API request");

        let mut request = self
            .http
            .request(method.as_reqwest(), &url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header());

        if let Some(body) = body {
            // .json() also sets Content-Type: application/json
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::connectivity(format!("{} {}: {}", path, "request failed", error_chain(&e))))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::connectivity(format!("failed to read response: {}", error_chain(&e))))?;

        tracing::debug!(status = status.as_u16(), body_length = body.len(), "Received API response");

        if !status.is_success() {
            return Err(Error::Transport {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }
}

// reqwest's Display stops at the outermost error; the cause is usually deeper
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
