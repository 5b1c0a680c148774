//! Async storage trait abstraction
//!
//! The sync manager and the inspection surface depend on this trait rather
//! than on `Storage`, so tests can substitute their own queue.

pub mod queue;

pub use queue::PendingActionStore;
