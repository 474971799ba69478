//! REST API module for the remote record service.
//!
//! This module provides the `ApiClient` for talking to the authoritative
//! record store, the `RemoteStore` seam the sync layer is written against,
//! and the collection router that maps collection names to resource paths.
//!
//! Every request carries the issued bearer token; without a token no request
//! is made at all.

pub mod client;
pub mod error;
pub mod remote;
pub mod routes;

pub use client::ApiClient;
pub use error::ApiError;
pub use remote::{Endpoint, Method, RemoteStore};
pub use routes::endpoint_for;
