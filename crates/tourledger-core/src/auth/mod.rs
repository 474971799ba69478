//! Bearer credential handling.
//!
//! Login happens elsewhere; this module only keeps the already-issued token
//! so requests to the record service can be authenticated.
//!
//! The session is persisted as `session.json` in the cache directory.

pub mod session;

pub use session::{Session, SessionData};
