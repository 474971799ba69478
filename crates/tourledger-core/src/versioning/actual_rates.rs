use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::collection::QUOTATIONS;
use crate::models::record::CREATED_AT_FIELD;
use crate::models::{now_timestamp, Fields, Record, RecordId};
use crate::sync::SyncGateway;

/// Marks a record as the actual-rates variant of another record.
pub const ACTUAL_RATES_FLAG: &str = "isActualRates";

/// Back-reference from a derived record to its source.
pub const ORIGINAL_RECORD_ID: &str = "originalRecordId";

/// Stamped on every save of a derived record.
pub const UPDATED_AT: &str = "updatedAt";

#[derive(Debug, Clone, PartialEq)]
pub enum DerivedState {
    /// No derived variant exists, and none was requested.
    Absent,
    /// Created by this call.
    Derived(Record),
    /// Already existed when the source was loaded.
    PresentOnLoad(Record),
}

/// Outcome of loading a source record together with its derived variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    /// `None` when the source id was found neither remotely nor locally.
    pub source: Option<Record>,
    pub state: DerivedState,
}

impl Derivation {
    pub fn derived(&self) -> Option<&Record> {
        match self.state {
            DerivedState::Derived(ref record) | DerivedState::PresentOnLoad(ref record) => {
                Some(record)
            }
            DerivedState::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.state, DerivedState::Absent)
    }
}

/// Get-or-create of the actual-rates variant of a record.
///
/// Works only through the gateway's public operations. Loads for the same
/// source id are serialized within the process, so concurrent first-time
/// loads cannot both create a variant.
pub struct ActualRatesWorkflow {
    gateway: Arc<SyncGateway>,
    collection: String,
    source_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ActualRatesWorkflow {
    /// Workflow over the quotations collection.
    pub fn new(gateway: Arc<SyncGateway>) -> Self {
        Self::for_collection(gateway, QUOTATIONS)
    }

    pub fn for_collection(gateway: Arc<SyncGateway>, collection: impl Into<String>) -> Self {
        Self {
            gateway,
            collection: collection.into(),
            source_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Load a source record and its actual-rates variant.
    ///
    /// An existing variant is returned as is. Otherwise one is created only
    /// if `create` is set; if persisting it fails, the in-memory copy is
    /// still returned.
    pub async fn load(&self, source_id: &RecordId, create: bool) -> Derivation {
        let lock = self.source_lock(source_id);
        let derivation = {
            let _guard = lock.lock().await;
            self.load_locked(source_id, create).await
        };
        drop(lock);
        self.release_source_lock(source_id);
        derivation
    }

    async fn load_locked(&self, source_id: &RecordId, create: bool) -> Derivation {
        let Some(source) = self.gateway.get_one(&self.collection, source_id).await else {
            debug!(collection = %self.collection, %source_id, "Source record not found");
            return Derivation {
                source: None,
                state: DerivedState::Absent,
            };
        };

        let records = self.gateway.list_all(&self.collection).await;
        if let Some(existing) = Self::find_derived(&records, source_id) {
            return Derivation {
                state: DerivedState::PresentOnLoad(existing.clone()),
                source: Some(source),
            };
        }

        if !create {
            return Derivation {
                source: Some(source),
                state: DerivedState::Absent,
            };
        }

        let derived = self.create_derived(&source).await;
        Derivation {
            source: Some(source),
            state: DerivedState::Derived(derived),
        }
    }

    /// Save edits to a derived record, stamping `updatedAt`.
    /// `None` when the derived record is not in the local cache.
    pub async fn save(&self, derived_id: &RecordId, mut patch: Fields) -> Option<Record> {
        patch.insert(UPDATED_AT.to_string(), Value::from(now_timestamp()));
        self.gateway.update(&self.collection, derived_id, patch).await
    }

    /// The first record flagged as actual rates whose back-reference equals
    /// `source_id`, compared numerically when both sides are integers.
    pub fn find_derived<'a>(records: &'a [Record], source_id: &RecordId) -> Option<&'a Record> {
        records.iter().find(|record| {
            record.get(ACTUAL_RATES_FLAG) == Some(&Value::Bool(true))
                && record
                    .get(ORIGINAL_RECORD_ID)
                    .is_some_and(|original| Self::refers_to(original, source_id))
        })
    }

    fn refers_to(original: &Value, source_id: &RecordId) -> bool {
        match (Self::numeric(original), source_id.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => RecordId::from_value(original).is_some_and(|id| id.matches(source_id)),
        }
    }

    fn numeric(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Deep copy of `source` marked as its actual-rates variant.
    fn derive_from(source: &Record) -> Record {
        let mut fields = source.fields.clone();
        fields.remove(UPDATED_AT);
        fields.remove(CREATED_AT_FIELD);
        let mut derived = Record {
            id: RecordId::generate(),
            created_at: Some(now_timestamp()),
            fields,
        };
        derived.set(ACTUAL_RATES_FLAG, true);
        derived.set(ORIGINAL_RECORD_ID, source.id.to_value());
        derived
    }

    async fn create_derived(&self, source: &Record) -> Record {
        let derived = Self::derive_from(source);
        match self.gateway.create(&self.collection, derived.to_fields()).await {
            Ok(created) => {
                info!(collection = %self.collection, source_id = %source.id, id = %created.id, "Created actual rates record");
                created
            }
            Err(e) => {
                warn!(collection = %self.collection, source_id = %source.id, error = %e, "Failed to persist actual rates record");
                derived
            }
        }
    }

    fn source_lock(&self, source_id: &RecordId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks().entry(source_id.key()).or_default().clone()
    }

    /// Drop the lock entry once no load holds or waits on it.
    fn release_source_lock(&self, source_id: &RecordId) {
        let mut locks = self.locks();
        let key = source_id.key();
        if locks.get(&key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&key);
        }
    }

    fn locks(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.source_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
