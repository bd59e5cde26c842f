//! Observable workspace state

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::locking::{read, write};

/// Lifecycle of a [`SyncController`](crate::SyncController).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Active,
    Stopping,
    Stopped,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Active => "active",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub active: bool,

    /// Branch the controller currently tracks
    pub branch: String,

    /// Last successful push or pull
    pub last_sync_time: Option<DateTime<Utc>>,

    pub last_commit_hash: Option<String>,

    /// Distinct paths in the current change batch
    pub pending_change_count: usize,

    /// Latched by a merge conflict or rejected push until a successful sync,
    /// a branch switch, or an explicit reset
    pub conflict_detected: bool,

    /// Diagnostic of the most recent failure, credential redacted
    pub last_error: Option<String>,
}

/// Holder that only ever swaps whole snapshots.
///
/// Writers build the next snapshot from a copy and assign it under the write
/// lock, so readers never observe a half-applied update.
#[derive(Debug, Default)]
pub(crate) struct StatusCell {
    inner: RwLock<SyncStatus>,
}

impl StatusCell {
    pub(crate) fn new(initial: SyncStatus) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub(crate) fn snapshot(&self) -> SyncStatus {
        read(&self.inner).clone()
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut SyncStatus)) {
        let mut guard = write(&self.inner);
        let mut next = guard.clone();
        apply(&mut next);
        *guard = next;
    }
}
