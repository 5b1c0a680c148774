#![allow(clippy::shadow_reuse, reason = "Shadowing for Arc clones is idiomatic")]
#![allow(clippy::single_call_fn, reason = "HTTP handlers are called once from router")]

pub mod connectivity;
pub mod events;
pub mod pre_count;
pub mod queue;
pub mod realtime;
