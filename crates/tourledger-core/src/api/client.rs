//! API client for the remote record service.
//!
//! This module provides the `ApiClient` struct, the HTTP implementation of
//! `RemoteStore`. It only knows the generic record contract; which requests
//! to send, and what to do when they fail, is decided by the sync layer.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde_json::Value;
use tracing::debug;

use super::remote::{Endpoint, Method, RemoteStore};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Identity endpoint used only to check that the service is reachable and the
/// token is accepted.
const IDENTITY_PATH: &str = "/auth/user";

/// Default HTTP request timeout in seconds.
/// Short on purpose: a slow remote is handled as an unavailable one.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 3;

/// API client for the record service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for the service rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Self::parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    fn parse_base_url(base_url: &str) -> Result<Url> {
        let url = Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;
        if url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot hold resource paths: {}", base_url);
        }
        Ok(url)
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Resolve an endpoint against the base URL. The record id, if any, is
    /// percent-encoded as a single trailing segment.
    fn url(&self, endpoint: &Endpoint) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ApiError::InvalidRequest(format!("Base URL cannot hold paths: {}", self.base_url))
            })?;
            segments
                .pop_if_empty()
                .extend(endpoint.path.split('/').filter(|s| !s.is_empty()));
            if let Some(ref id) = endpoint.id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::NoCredential)?;
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidCredential(e.to_string()))?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Decode a JSON body; an empty body reads as `null`.
    fn decode_body(text: &str) -> Result<Value, ApiError> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(text)
            .map_err(|e| ApiError::InvalidResponse(format!("Malformed JSON body: {}", e)))
    }
}

#[async_trait]
impl RemoteStore for ApiClient {
    fn has_credential(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    async fn probe(&self) -> Result<(), ApiError> {
        let url = self.url(&Endpoint::collection(IDENTITY_PATH))?;
        let response = self
            .client
            .get(url)
            .headers(self.auth_headers()?)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(endpoint)?;
        debug!(%method, %url, "Sending request");

        let mut request = self
            .client
            .request(method.as_reqwest(), url)
            .headers(self.auth_headers()?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = Self::check_response(request.send().await?).await?;
        let text = response.text().await?;
        Self::decode_body(&text)
    }
}
