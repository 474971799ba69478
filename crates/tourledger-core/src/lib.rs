//! Core library for tourledger.
//!
//! Provides the offline-tolerant persistence layer used by every page of the
//! tour-operator record tool:
//!
//! - `api`: REST client for the remote record service and the collection router
//! - `cache`: durable per-collection local record cache
//! - `sync`: availability probing and the `SyncGateway` fallback policy
//! - `versioning`: get-or-create of the "actual rates" variant of a quotation
//! - `auth`, `config`: the issued bearer credential and application settings

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod sync;
pub mod versioning;

pub use api::{ApiClient, ApiError, RemoteStore};
pub use cache::CacheManager;
pub use config::Config;
pub use models::{Fields, Record, RecordId};
pub use sync::{DeleteOutcome, GatewayError, SyncGateway, SyncOptions};
pub use versioning::{ActualRatesWorkflow, Derivation, DerivedState};
