//! Service layer for pharmasync
//!
//! Sits between the HTTP/CLI surfaces and the queue store and remote client.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::let_underscore_untyped, reason = "Type is clear from context")]
#![allow(clippy::let_underscore_must_use, reason = "Intentionally ignoring results")]
#![allow(let_underscore_drop, reason = "Intentionally dropping values")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short error vars are idiomatic")]

mod connectivity;
mod error;
pub mod events;
mod pre_count;
mod queue_service;
mod sync_manager;

pub use connectivity::Connectivity;
pub use error::ServiceError;
pub use events::{DrainOutcome, DrainReport, Notification, NotificationLevel, SkipReason, SyncEvent};
pub use pre_count::{Delivery, ItemChange, PreCountService};
pub use queue_service::{QueueService, QueueSnapshot};
pub use sync_manager::{EVENT_CHANNEL_CAPACITY, Submitted, SyncManager};

#[cfg(test)]
mod tests;
