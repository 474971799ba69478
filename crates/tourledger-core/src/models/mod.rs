//! Data models for tour-operator records.
//!
//! Records are semi-structured documents: a required core (`id`, `createdAt`)
//! plus an open bag of named fields. Collections are plain names such as
//! `reservations`, `quotations` and `offers`.

pub mod collection;
pub mod record;

pub use record::{now_timestamp, Fields, Record, RecordId};
