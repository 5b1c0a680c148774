//! Core types for pharmasync
//!
//! Domain types shared by the queue store, the remote client, the sync
//! manager and the optimistic pre-count layer.

mod action;
pub mod config;
pub mod constants;
mod env_config;
mod error;
mod inventory;
mod optimistic;

pub use action::*;
pub use config::{RetryPolicy, SyncConfig};
pub use env_config::env_parse_with_default;
pub use error::*;
pub use inventory::*;
pub use optimistic::*;

/// Current time as epoch milliseconds, the unit used for queue timestamps.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
