//! Events published on the shared broadcast channel and streamed over SSE.

use pharmasync_core::{ActionType, EntityKind};
use serde::Serialize;

/// Why a drain request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DrainOutcome {
    Completed,
    Skipped { reason: SkipReason },
}

/// Summary of one drain request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub outcome: DrainOutcome,
    pub attempted: usize,
    pub succeeded: usize,
    /// Attempts that failed and left the record `pending`.
    pub retried: usize,
    /// Attempts that failed and left the record `failed`.
    pub failed: usize,
    /// Records left untouched because an earlier record for the same
    /// target did not sync in this pass.
    pub deferred: usize,
    /// Records whose queue bookkeeping failed; released back to `pending`.
    pub errored: usize,
}

impl DrainReport {
    #[must_use]
    pub const fn completed() -> Self {
        Self {
            outcome: DrainOutcome::Completed,
            attempted: 0,
            succeeded: 0,
            retried: 0,
            failed: 0,
            deferred: 0,
            errored: 0,
        }
    }

    #[must_use]
    pub const fn skipped(reason: SkipReason) -> Self {
        Self { outcome: DrainOutcome::Skipped { reason }, ..Self::completed() }
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self.outcome, DrainOutcome::Skipped { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Toast-style message for the user who triggered an optimistic mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ean: Option<String>,
}

impl Notification {
    #[must_use]
    pub fn error(message: impl Into<String>, ean: Option<&str>) -> Self {
        Self { level: NotificationLevel::Error, message: message.into(), ean: ean.map(str::to_owned) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Enqueued { id: i64, action_type: ActionType, entity: EntityKind, target: String },
    Syncing { id: i64 },
    Synced { id: i64 },
    Retrying { id: i64, retries: u32, error: String },
    Failed { id: i64, retries: u32, error: String },
    DrainFinished { report: DrainReport },
    Connectivity { online: bool },
    Notification { notification: Notification },
}
