//! Local caching module for offline record access.
//!
//! This module provides the `CacheManager`, the local cache-of-record every
//! sync operation reads first and writes always. Each collection is kept as
//! one JSON array of records and is considered stale after 60 minutes
//! without a write.

pub mod manager;

pub use manager::{CacheAge, CacheManager};
