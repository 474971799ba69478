use thiserror::Error;

use crate::models::record::RecordError;

/// Failures surfaced to gateway callers.
///
/// Network trouble never shows up here; it degrades to the local result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] RecordError),
}
