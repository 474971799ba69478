//! In-memory stand-in for the remote record service.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

use tourledger_core::api::{ApiError, Endpoint, Method, RemoteStore};
use tourledger_core::{CacheManager, Fields, SyncGateway, SyncOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Probe and requests succeed.
    Online,
    /// No bearer token: nothing is ever sent.
    NoCredential,
    /// Identity check rejected.
    ProbeRejected,
    /// Identity check passes, every record request answers with this status.
    Rejecting(u16),
    /// Identity check passes, record requests never complete.
    Hanging,
}

pub struct FakeRemote {
    mode: Mutex<Mode>,
    collections: Mutex<HashMap<String, Vec<Value>>>,
    next_id: AtomicI64,
    pub probes: AtomicUsize,
    requests: Mutex<Vec<(Method, String)>>,
}

impl FakeRemote {
    pub fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            collections: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1000),
            probes: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn mode(&self) -> Mode {
        *self.mode.lock().unwrap()
    }

    /// Seed server-side records for a resource path such as `/quotations`.
    pub fn seed(&self, path: &str, records: Vec<Value>) {
        self.collections
            .lock()
            .unwrap()
            .insert(path.to_string(), records);
    }

    pub fn stored(&self, path: &str) -> Vec<Value> {
        self.collections
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.requests().iter().filter(|(m, _)| *m == method).count()
    }

    fn key_of(value: &Value) -> String {
        match &value["id"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn not_found(id: &str) -> ApiError {
        ApiError::from_status(StatusCode::NOT_FOUND, id)
    }

    fn handle(&self, method: Method, endpoint: &Endpoint, body: Option<&Value>) -> Result<Value, ApiError> {
        let mut collections = self.collections.lock().unwrap();
        let records = collections.entry(endpoint.path.clone()).or_default();

        match (method, endpoint.id.as_deref()) {
            (Method::Get, None) => Ok(Value::Array(records.clone())),
            (Method::Post, None) => {
                let mut record = body.cloned().unwrap_or_else(|| json!({}));
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                record["id"] = json!(id);
                record["createdAt"] = json!("2030-01-01T00:00:00.000Z");
                records.push(record.clone());
                Ok(record)
            }
            (Method::Get, Some(id)) => records
                .iter()
                .find(|r| Self::key_of(r) == id)
                .cloned()
                .ok_or_else(|| Self::not_found(id)),
            (Method::Put, Some(id)) => {
                let record = records
                    .iter_mut()
                    .find(|r| Self::key_of(r) == id)
                    .ok_or_else(|| Self::not_found(id))?;
                if let (Some(target), Some(Value::Object(patch))) = (record.as_object_mut(), body) {
                    for (k, v) in patch {
                        target.insert(k.clone(), v.clone());
                    }
                }
                record["serverRevision"] = json!(true);
                Ok(record.clone())
            }
            (Method::Delete, Some(id)) => {
                let before = records.len();
                records.retain(|r| Self::key_of(r) != id);
                if records.len() == before {
                    return Err(Self::not_found(id));
                }
                Ok(json!({ "deleted": id }))
            }
            _ => Err(ApiError::from_status(StatusCode::METHOD_NOT_ALLOWED, "")),
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    fn has_credential(&self) -> bool {
        self.mode() != Mode::NoCredential
    }

    async fn probe(&self) -> Result<(), ApiError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.mode() {
            Mode::ProbeRejected => Err(ApiError::Unauthorized),
            _ => Ok(()),
        }
    }

    async fn send(&self, method: Method, endpoint: &Endpoint, body: Option<&Value>) -> Result<Value, ApiError> {
        self.requests
            .lock()
            .unwrap()
            .push((method, endpoint.to_string()));
        match self.mode() {
            Mode::Online => self.handle(method, endpoint, body),
            Mode::Rejecting(code) => Err(ApiError::from_status(
                StatusCode::from_u16(code).expect("valid status"),
                "rejected",
            )),
            Mode::Hanging => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Mode::NoCredential | Mode::ProbeRejected => {
                panic!("request sent while the service is unavailable")
            }
        }
    }
}

/// Gateway over `remote` with a fresh cache directory. Availability is
/// never cached so mode switches take effect immediately.
pub fn gateway(remote: Arc<FakeRemote>) -> (TempDir, SyncGateway) {
    let options = SyncOptions {
        availability_ttl: std::time::Duration::ZERO,
        ..SyncOptions::default()
    };
    gateway_with(remote, options)
}

pub fn gateway_with(remote: Arc<FakeRemote>, options: SyncOptions) -> (TempDir, SyncGateway) {
    let dir = tempfile::tempdir().expect("temp dir");
    let cache = CacheManager::new(dir.path().join("cache")).expect("cache dir");
    (dir, SyncGateway::new(remote, cache, options))
}

pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

pub const FAILING_MODES: [Mode; 5] = [
    Mode::NoCredential,
    Mode::ProbeRejected,
    Mode::Rejecting(404),
    Mode::Rejecting(500),
    Mode::Hanging,
];
