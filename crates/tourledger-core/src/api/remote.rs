//! The seam between the sync layer and the remote record service.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use super::ApiError;
use crate::models::RecordId;

/// HTTP verbs used by the record contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_reqwest(), f)
    }
}

/// A collection resource path, optionally narrowed to one record.
///
/// The id is kept separate from the path so the client can percent-encode it
/// as a single path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub id: Option<String>,
}

impl Endpoint {
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: None,
        }
    }

    pub fn record(path: impl Into<String>, id: &RecordId) -> Self {
        Self {
            path: path.into(),
            id: Some(id.key()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(ref id) => write!(f, "{}/{}", self.path, id),
            None => write!(f, "{}", self.path),
        }
    }
}

/// Authoritative remote store for record collections.
///
/// Implemented by `ApiClient` over HTTP; tests substitute in-memory fakes.
/// Implementations report every failure as an `ApiError` and never panic on
/// bad responses.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether a bearer credential is present. No request is made without one.
    fn has_credential(&self) -> bool;

    /// Lightweight authenticated identity check (`GET /auth/user`).
    async fn probe(&self) -> Result<(), ApiError>;

    /// Send one JSON request and return the decoded JSON body.
    /// An empty success body decodes as `Value::Null`.
    async fn send(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: Option<&Value>,
    ) -> Result<Value, ApiError>;
}
