//! Raw and aggregated change events

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use wsync_fs::NormalizedPath;

/// Kind of a raw OS notification, mapped but not interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Created,
    Modified,
    Removed,
    /// Access and unclassified notifications
    Other,
}

/// One notification as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Absolute path as reported by the OS
    pub path: PathBuf,
    pub kind: RawEventKind,
    pub observed_at: Instant,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kind: RawEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
            observed_at: Instant::now(),
        }
    }
}

/// Kind of a pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub(crate) fn from_raw(kind: RawEventKind) -> Option<Self> {
        match kind {
            RawEventKind::Created => Some(Self::Added),
            RawEventKind::Modified => Some(Self::Modified),
            RawEventKind::Removed => Some(Self::Deleted),
            RawEventKind::Other => None,
        }
    }
}

/// One coalesced observation of a workspace-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub relative_path: NormalizedPath,
    pub kind: ChangeKind,
    pub observed_at: Instant,
}
