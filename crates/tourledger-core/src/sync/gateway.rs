use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::availability::{AvailabilityProbe, DEFAULT_AVAILABILITY_TTL_SECS};
use super::GatewayError;
use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::api::{endpoint_for, ApiError, Endpoint, Method, RemoteStore};
use crate::cache::CacheManager;
use crate::models::{Fields, Record, RecordId};

/// Tuning for a `SyncGateway`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upper bound for every remote call, including the probe.
    pub request_timeout: Duration,
    /// How long an availability answer is reused.
    pub availability_ttl: Duration,
    /// Never contact the remote service.
    pub offline_mode: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            availability_ttl: Duration::from_secs(DEFAULT_AVAILABILITY_TTL_SECS),
            offline_mode: false,
        }
    }
}

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Local,
}

/// Result of `SyncGateway::delete`.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// The remote service confirmed; carries its response body.
    Remote(Value),
    /// Deleted locally only; carries the remaining local records.
    Local(Vec<Record>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub collection: String,
    pub source: Source,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayStatus {
    pub available: bool,
    pub offline_mode: bool,
    /// `(collection, age display)` pairs
    pub cache_ages: Vec<(String, String)>,
    /// Some collection is uncached or older than an hour.
    pub stale: bool,
}

/// Single entry point for record CRUD against named collections.
///
/// Each operation computes its local-only result before touching the
/// network, attempts the remote call only when the service is available,
/// and adopts the remote answer only if that call succeeds. Network
/// failures are logged and never returned to the caller.
pub struct SyncGateway {
    remote: Arc<dyn RemoteStore>,
    cache: CacheManager,
    probe: AvailabilityProbe,
    request_timeout: Duration,
}

impl SyncGateway {
    pub fn new(remote: Arc<dyn RemoteStore>, cache: CacheManager, options: SyncOptions) -> Self {
        Self {
            remote,
            cache,
            probe: AvailabilityProbe::new(
                options.availability_ttl,
                options.request_timeout,
                options.offline_mode,
            ),
            request_timeout: options.request_timeout,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn probe(&self) -> &AvailabilityProbe {
        &self.probe
    }

    pub async fn is_available(&self) -> bool {
        self.probe.is_available(self.remote.as_ref()).await
    }

    /// One remote call bounded by the request timeout.
    async fn call(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        match tokio::time::timeout(self.request_timeout, self.remote.send(method, endpoint, body)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(self.request_timeout.as_secs())),
        }
    }

    fn persist(&self, collection: &str, records: &[Record]) {
        if let Err(e) = self.cache.write_all(collection, records) {
            warn!(collection, error = %e, "Failed to persist collection locally");
        }
    }

    fn decode_record(value: Value) -> Result<Record, ApiError> {
        Record::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Not a record: {}", e)))
    }

    fn decode_records(value: Value) -> Result<Vec<Record>, ApiError> {
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Not a record list: {}", e)))
    }

    fn upsert(records: &mut Vec<Record>, record: Record) {
        match records.iter().position(|r| r.id.matches(&record.id)) {
            Some(pos) => records[pos] = record,
            None => records.push(record),
        }
    }

    fn log_fallback(operation: &str, collection: &str, error: &ApiError) {
        warn!(operation, collection, error = %error, "Remote call failed, using local result");
    }

    // ===== Create =====

    /// Create a record. `id` and `createdAt` are assigned when absent.
    ///
    /// The candidate is always appended to the local copy. When the remote
    /// accepts the record, the server's version is appended as well and
    /// returned, so both rows are cached. Otherwise the candidate is
    /// returned. Fails only for an `id` that is neither an integer nor a
    /// string.
    pub async fn create(&self, collection: &str, fields: Fields) -> Result<Record, GatewayError> {
        let mut records = self.cache.read_all(collection);
        let candidate = Record::from_fields(fields.clone())?;
        records.push(candidate.clone());

        if self.is_available().await {
            let endpoint = Endpoint::collection(endpoint_for(collection));
            let body = Value::Object(fields);
            match self
                .call(Method::Post, &endpoint, Some(&body))
                .await
                .and_then(Self::decode_record)
            {
                Ok(created) => {
                    records.push(created.clone());
                    self.persist(collection, &records);
                    debug!(collection, id = %created.id, "Created remotely");
                    return Ok(created);
                }
                Err(e) => Self::log_fallback("create", collection, &e),
            }
        }

        self.persist(collection, &records);
        Ok(candidate)
    }

    // ===== Read =====

    /// All records of a collection.
    pub async fn list_all(&self, collection: &str) -> Vec<Record> {
        self.list_all_with_source(collection).await.0
    }

    /// All records of a collection and whether the remote supplied them.
    /// A remote answer replaces the cached list verbatim.
    pub async fn list_all_with_source(&self, collection: &str) -> (Vec<Record>, Source) {
        let local = self.cache.read_all(collection);

        if self.is_available().await {
            let endpoint = Endpoint::collection(endpoint_for(collection));
            match self
                .call(Method::Get, &endpoint, None)
                .await
                .and_then(Self::decode_records)
            {
                Ok(remote) => {
                    self.persist(collection, &remote);
                    return (remote, Source::Remote);
                }
                Err(e) => Self::log_fallback("list", collection, &e),
            }
        }

        (local, Source::Local)
    }

    /// Cached records only; never touches the network.
    pub fn list_all_local(&self, collection: &str) -> Vec<Record> {
        self.cache.read_all(collection)
    }

    /// One record by id. `None` means it was found neither remotely nor
    /// locally.
    pub async fn get_one(&self, collection: &str, id: &RecordId) -> Option<Record> {
        let mut records = self.cache.read_all(collection);
        let local = records.iter().find(|r| r.id.matches(id)).cloned();

        if self.is_available().await {
            let endpoint = Endpoint::record(endpoint_for(collection), id);
            match self
                .call(Method::Get, &endpoint, None)
                .await
                .and_then(Self::decode_record)
            {
                Ok(remote) => {
                    Self::upsert(&mut records, remote.clone());
                    self.persist(collection, &records);
                    return Some(remote);
                }
                Err(e) => Self::log_fallback("get", collection, &e),
            }
        }

        local
    }

    /// Cached record only; never touches the network.
    pub fn get_one_local(&self, collection: &str, id: &RecordId) -> Option<Record> {
        self.cache
            .read_all(collection)
            .into_iter()
            .find(|r| r.id.matches(id))
    }

    // ===== Update =====

    /// Apply a patch to an existing record.
    ///
    /// `None` when the id is not in the local cache: there is nothing to
    /// update and no remote call is made.
    pub async fn update(&self, collection: &str, id: &RecordId, patch: Fields) -> Option<Record> {
        let mut records = self.cache.read_all(collection);
        let Some(pos) = records.iter().position(|r| r.id.matches(id)) else {
            debug!(collection, %id, "Update of unknown record ignored");
            return None;
        };
        let merged = records[pos].merged(&patch);

        if self.is_available().await {
            let endpoint = Endpoint::record(endpoint_for(collection), id);
            let body = Value::Object(patch);
            match self
                .call(Method::Put, &endpoint, Some(&body))
                .await
                .and_then(Self::decode_record)
            {
                Ok(updated) => {
                    records[pos] = updated.clone();
                    self.persist(collection, &records);
                    return Some(updated);
                }
                Err(e) => Self::log_fallback("update", collection, &e),
            }
        }

        records[pos] = merged.clone();
        self.persist(collection, &records);
        Some(merged)
    }

    // ===== Delete =====

    /// Delete a record. The local removal is committed whatever the remote
    /// outcome, so a failed remote delete cannot bring the record back.
    pub async fn delete(&self, collection: &str, id: &RecordId) -> DeleteOutcome {
        let remaining: Vec<Record> = self
            .cache
            .read_all(collection)
            .into_iter()
            .filter(|r| !r.id.matches(id))
            .collect();

        if self.is_available().await {
            let endpoint = Endpoint::record(endpoint_for(collection), id);
            match self.call(Method::Delete, &endpoint, None).await {
                Ok(body) => {
                    self.persist(collection, &remaining);
                    return DeleteOutcome::Remote(body);
                }
                Err(e) => Self::log_fallback("delete", collection, &e),
            }
        }

        self.persist(collection, &remaining);
        DeleteOutcome::Local(remaining)
    }

    // ===== Bulk =====

    /// List several collections concurrently, refreshing their caches.
    pub async fn refresh_all(&self, collections: &[&str]) -> Vec<RefreshReport> {
        // Settle availability once so the concurrent lists share one probe
        let available = self.is_available().await;
        info!(available, count = collections.len(), "Refreshing collections");

        let results = futures::future::join_all(
            collections
                .iter()
                .map(|collection| self.list_all_with_source(collection)),
        )
        .await;

        collections
            .iter()
            .zip(results)
            .map(|(collection, (records, source))| RefreshReport {
                collection: collection.to_string(),
                source,
                count: records.len(),
            })
            .collect()
    }

    pub async fn status(&self, collections: &[&str]) -> GatewayStatus {
        GatewayStatus {
            available: self.is_available().await,
            offline_mode: self.probe.offline_mode(),
            cache_ages: self.cache.ages(collections),
            stale: self.cache.any_stale(collections),
        }
    }
}
