//! Client for the hosted inventory backend.
//!
//! Tables are reached through PostgREST-style endpoints under `/rest/v1`.
//! Creates are upserts on each table's business key so a replayed action
//! lands on the same row.

mod backend;
mod client;
pub mod error;

pub use backend::RemoteBackend;
pub use client::{Filter, RestClient};
pub use error::RemoteError;
