//! Filtering, coalescing and debouncing of raw events.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;
use wsync_fs::{NormalizedPath, is_ignored};

use crate::{ChangeKind, PendingChange, RawEvent};

/// Distinct pending paths that force a commit once the batch settles.
pub const AUTO_COMMIT_THRESHOLD: usize = 5;

/// Quiet period after the last accepted event before a batch counts as settled.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(1);

/// Accumulates the pending change batch of one workspace.
///
/// Not thread-safe on its own; the owner serializes access.
#[derive(Debug)]
pub struct ChangeAggregator {
    root: NormalizedPath,
    quiet_period: Duration,
    threshold: usize,
    /// Ordered by first observation within the batch
    pending: Vec<PendingChange>,
    index: HashMap<NormalizedPath, usize>,
    last_accepted: Option<Instant>,
    /// Set once the threshold signal fired for the current batch
    threshold_fired: bool,
}

impl ChangeAggregator {
    pub fn new(root: NormalizedPath, quiet_period: Duration) -> Self {
        Self {
            root,
            quiet_period,
            threshold: AUTO_COMMIT_THRESHOLD,
            pending: Vec::new(),
            index: HashMap::new(),
            last_accepted: None,
            threshold_fired: false,
        }
    }

    /// Record one raw event. Returns `false` when the event was rejected.
    ///
    /// Rejected: paths outside the root, ignored paths, existing directories,
    /// and notifications that do not describe a change.
    pub fn ingest(&mut self, event: RawEvent) -> bool {
        let Some(kind) = ChangeKind::from_raw(event.kind) else {
            return false;
        };
        let Some(relative) = self.root.relative(&event.path) else {
            return false;
        };
        if is_ignored(&relative) {
            return false;
        }
        if kind != ChangeKind::Deleted && event.path.is_dir() {
            return false;
        }

        match self.index.get(&relative) {
            Some(&slot) => {
                let existing = &mut self.pending[slot];
                existing.kind = kind;
                existing.observed_at = event.observed_at;
            }
            None => {
                self.index.insert(relative.clone(), self.pending.len());
                self.pending.push(PendingChange {
                    relative_path: relative,
                    kind,
                    observed_at: event.observed_at,
                });
            }
        }

        self.last_accepted = Some(match self.last_accepted {
            Some(previous) => previous.max(event.observed_at),
            None => event.observed_at,
        });
        true
    }

    /// Number of distinct paths in the current batch.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Snapshot of the current batch without clearing it.
    pub fn pending(&self) -> &[PendingChange] {
        &self.pending
    }

    /// Return and clear the current batch. Re-arms the threshold signal.
    pub fn drain_batch(&mut self) -> Vec<PendingChange> {
        self.index.clear();
        self.last_accepted = None;
        self.threshold_fired = false;
        std::mem::take(&mut self.pending)
    }

    /// Put back changes drained for a commit that never happened.
    ///
    /// A path observed again since the drain keeps its newer entry. The
    /// threshold signal stays disarmed until the next drain, so a failing
    /// commit is retried by the periodic flush rather than immediately.
    pub fn restore(&mut self, batch: Vec<PendingChange>) {
        if batch.is_empty() {
            return;
        }
        for change in batch {
            if self.index.contains_key(&change.relative_path) {
                continue;
            }
            self.last_accepted = Some(match self.last_accepted {
                Some(previous) => previous.max(change.observed_at),
                None => change.observed_at,
            });
            self.index.insert(change.relative_path.clone(), self.pending.len());
            self.pending.push(change);
        }
        self.threshold_fired = true;
    }

    /// Whether a non-empty batch has seen no new events for the quiet period.
    pub fn is_settled(&self, now: Instant) -> bool {
        match self.last_accepted {
            Some(last) => !self.pending.is_empty() && now.saturating_duration_since(last) >= self.quiet_period,
            None => false,
        }
    }

    /// How long until the current batch settles, `None` if there is nothing pending.
    pub fn time_until_settled(&self, now: Instant) -> Option<Duration> {
        let last = self.last_accepted?;
        if self.pending.is_empty() {
            return None;
        }
        Some(self.quiet_period.saturating_sub(now.saturating_duration_since(last)))
    }

    /// Check the auto-commit threshold.
    ///
    /// Returns `true` exactly once per batch: when the batch has settled with at
    /// least the threshold number of distinct paths. Further events do not fire
    /// again until [`drain_batch`](Self::drain_batch) re-arms it.
    pub fn take_commit_signal(&mut self, now: Instant) -> bool {
        if self.threshold_fired || self.pending.len() < self.threshold || !self.is_settled(now) {
            return false;
        }
        self.threshold_fired = true;
        debug!(pending = self.pending.len(), "Auto-commit threshold reached");
        true
    }
}
