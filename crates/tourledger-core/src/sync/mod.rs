//! Offline-tolerant record synchronization.
//!
//! `SyncGateway` is the single entry point for record CRUD. Every operation
//! first computes its local-only answer from the cache, then asks the
//! remote service if the `AvailabilityProbe` says it is reachable, and lets
//! the remote answer win only when the call succeeds.

pub mod availability;
pub mod error;
pub mod gateway;

pub use availability::AvailabilityProbe;
pub use error::GatewayError;
pub use gateway::{DeleteOutcome, GatewayStatus, RefreshReport, Source, SyncGateway, SyncOptions};
