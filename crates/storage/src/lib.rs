//! Storage layer for pharmasync
//!
//! SQLite-backed durable queue of pending mutations. Survives process
//! restarts; every access goes through the narrow operation set of
//! [`traits::PendingActionStore`].

pub mod error;
mod migrations;
mod sqlite_async;
mod storage;
#[cfg(test)]
mod tests;
pub mod traits;

pub use error::StorageError;
pub use storage::Storage;
