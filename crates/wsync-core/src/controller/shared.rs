//! State shared between a controller and its background threads.

use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};
use wsync_fs::{NormalizedPath, WorkspaceLock};
use wsync_git::{ChangeSummary, ErrorKind, GitOperator};
use wsync_watch::{ChangeAggregator, PendingChange, RawEvent};

use super::message::render;
use super::{CommitOutcome, SyncOutcome};
use crate::locking::{lock, read, try_lock, write};
use crate::status::StatusCell;
use crate::{Error, LifecycleState, Result, SyncPolicy, SyncStatus, WorkspaceHandle};

/// Who asked for a git operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Caller,
    Background,
}

/// The operator together with the workspace lock it works under.
pub(crate) struct GitSlot {
    pub(crate) operator: Box<dyn GitOperator>,
    pub(crate) lock: Option<WorkspaceLock>,
}

pub(crate) struct Shared {
    pub(crate) handle: WorkspaceHandle,
    pub(crate) policy: SyncPolicy,
    pub(crate) root: NormalizedPath,
    branch: RwLock<String>,
    /// Every git call for this workspace goes through this mutex
    git: Mutex<GitSlot>,
    aggregator: Mutex<ChangeAggregator>,
    status: StatusCell,
    state: RwLock<LifecycleState>,
}

/// Exclusive access to the operator for one logical operation.
///
/// Dropping the session after the controller left `Active` releases the
/// workspace lock, so an operation that was in flight during `Stop` still
/// hands the working tree back once it finishes.
pub(crate) struct GitSession<'a> {
    shared: &'a Shared,
    slot: MutexGuard<'a, GitSlot>,
}

impl Deref for GitSession<'_> {
    type Target = dyn GitOperator;

    fn deref(&self) -> &Self::Target {
        &*self.slot.operator
    }
}

impl Drop for GitSession<'_> {
    fn drop(&mut self) {
        if !self.shared.is_active() && self.slot.lock.take().is_some() {
            debug!(handle = %self.shared.handle, "Released workspace lock");
        }
    }
}

impl Shared {
    pub(crate) fn new(
        handle: WorkspaceHandle,
        policy: SyncPolicy,
        root: NormalizedPath,
        slot: GitSlot,
        initial: SyncStatus,
    ) -> Self {
        let aggregator = ChangeAggregator::new(root.clone(), policy.quiet_period());
        Self {
            branch: RwLock::new(policy.branch.clone()),
            handle,
            policy,
            root,
            git: Mutex::new(slot),
            aggregator: Mutex::new(aggregator),
            status: StatusCell::new(initial),
            state: RwLock::new(LifecycleState::Initializing),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub(crate) fn state(&self) -> LifecycleState {
        *read(&self.state)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    pub(crate) fn set_state(&self, state: LifecycleState) {
        *write(&self.state) = state;
    }

    /// Move to `Stopping` unless a stop already began. Returns whether it did.
    pub(crate) fn begin_stop(&self) -> bool {
        let mut state = write(&self.state);
        match *state {
            LifecycleState::Stopping | LifecycleState::Stopped => false,
            _ => {
                *state = LifecycleState::Stopping;
                true
            }
        }
    }

    /// Release the workspace lock now unless an operation is in flight, in
    /// which case its session releases it on completion.
    pub(crate) fn release_lock_if_idle(&self) {
        if let Some(mut slot) = try_lock(&self.git)
            && slot.lock.take().is_some()
        {
            debug!(handle = %self.handle, "Released workspace lock");
        }
    }

    /// Block until no git operation is running.
    pub(crate) fn wait_idle(&self) {
        drop(lock(&self.git));
    }

    pub(crate) fn branch(&self) -> String {
        read(&self.branch).clone()
    }

    pub(crate) fn set_branch(&self, name: &str) {
        *write(&self.branch) = name.to_string();
    }

    pub(crate) fn status(&self) -> SyncStatus {
        self.status.snapshot()
    }

    pub(crate) fn update_status(&self, apply: impl FnOnce(&mut SyncStatus)) {
        self.status.update(apply);
    }

    // ------------------------------------------------------------------
    // Git sessions
    // ------------------------------------------------------------------

    /// Session for a caller-invoked operation; fails once the controller stopped.
    pub(crate) fn session(&self) -> Result<GitSession<'_>> {
        self.background_session().ok_or_else(|| Error::NotActive {
            handle: self.handle.clone(),
        })
    }

    /// Session for a background operation; `None` once the controller stopped.
    pub(crate) fn background_session(&self) -> Option<GitSession<'_>> {
        if !self.is_active() {
            return None;
        }
        let session = GitSession {
            shared: self,
            slot: lock(&self.git),
        };
        // Stop may have happened while waiting for the mutex
        self.is_active().then_some(session)
    }

    // ------------------------------------------------------------------
    // Change batch
    // ------------------------------------------------------------------

    pub(crate) fn ingest(&self, events: impl IntoIterator<Item = RawEvent>) {
        let mut aggregator = lock(&self.aggregator);
        let mut accepted = 0usize;
        for event in events {
            if aggregator.ingest(event) {
                accepted += 1;
            }
        }
        if accepted > 0 {
            let pending = aggregator.pending_count();
            debug!(handle = %self.handle, accepted, pending, "Ingested changes");
            self.status.update(|s| s.pending_change_count = pending);
        }
    }

    /// How long the event loop may sleep before the batch needs another look.
    pub(crate) fn time_until_settled(&self) -> Option<Duration> {
        lock(&self.aggregator)
            .time_until_settled(Instant::now())
            .filter(|wait| !wait.is_zero())
    }

    pub(crate) fn take_commit_signal(&self) -> bool {
        lock(&self.aggregator).take_commit_signal(Instant::now())
    }

    pub(crate) fn has_settled_batch(&self) -> bool {
        lock(&self.aggregator).is_settled(Instant::now())
    }

    fn pending_count(&self) -> usize {
        lock(&self.aggregator).pending_count()
    }

    fn drain_pending(&self) -> Vec<PendingChange> {
        let mut aggregator = lock(&self.aggregator);
        let batch = aggregator.drain_batch();
        self.status.update(|s| s.pending_change_count = 0);
        batch
    }

    fn restore_pending(&self, batch: Vec<PendingChange>) {
        if batch.is_empty() {
            return;
        }
        let mut aggregator = lock(&self.aggregator);
        aggregator.restore(batch);
        let pending = aggregator.pending_count();
        self.status.update(|s| s.pending_change_count = pending);
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Commit whatever the batch accumulated, unless a conflict is waiting
    /// for the user.
    pub(crate) fn auto_commit(&self) {
        if self.pending_count() == 0 {
            return;
        }
        let Some(git) = self.background_session() else {
            return;
        };
        if self.status.snapshot().conflict_detected {
            debug!(handle = %self.handle, "Conflict pending, leaving changes uncommitted");
            return;
        }
        // Failures are recorded in the status
        let _ = self.commit_and_sync(&git, None, Origin::Background);
    }

    /// One periodic timer tick.
    pub(crate) fn tick(&self) {
        if self.policy.auto_commit && self.has_settled_batch() {
            self.auto_commit();
        }
        if self.policy.auto_pull
            && let Some(git) = self.background_session()
        {
            let _ = self.sync_with_remote(&git, Origin::Background);
        }
    }

    pub(crate) fn commit_and_sync(
        &self,
        git: &GitSession<'_>,
        message: Option<&str>,
        origin: Origin,
    ) -> Result<CommitOutcome> {
        let result = self.commit_locked(git, message);
        if let Err(e) = &result {
            self.record_failure(e, origin);
        }
        result
    }

    pub(crate) fn sync_with_remote(
        &self,
        git: &GitSession<'_>,
        origin: Origin,
    ) -> Result<SyncOutcome> {
        let result = self.sync_locked(git, origin);
        if let Err(e) = &result {
            self.record_failure(e, origin);
        }
        result
    }

    fn commit_locked(&self, git: &GitSession<'_>, message: Option<&str>) -> Result<CommitOutcome> {
        let branch = self.branch();

        if self.policy.auto_pull {
            git.fetch()?;
            if git.remote_commit(&branch)?.is_some() {
                git.pull(&branch)?;
            }
        }

        // Drained before staging: anything observed while `add` runs stays
        // pending for the next commit
        let batch = self.drain_pending();
        let committed = match self.commit_staged(git, message, &branch) {
            Ok(committed) => committed,
            Err(e) => {
                self.restore_pending(batch);
                return Err(e);
            }
        };

        let Some((hash, summary)) = committed else {
            let unpushed = git.unpushed_commits(&branch)?;
            if unpushed == 0 {
                debug!(handle = %self.handle, drained = batch.len(), "Nothing to commit");
                return Ok(CommitOutcome::NothingToCommit);
            }
            git.push(&branch)?;
            info!(handle = %self.handle, branch = %branch, commits = unpushed, "Pushed existing commits");
            self.mark_synced(git.head_commit()?);
            return Ok(CommitOutcome::PushedExisting { commits: unpushed });
        };

        git.push(&branch)?;
        info!(handle = %self.handle, branch = %branch, "Pushed");
        self.mark_synced(Some(hash.clone()));

        Ok(CommitOutcome::Committed { hash, summary })
    }

    /// Stage the working tree and commit it; `None` when nothing was staged.
    fn commit_staged(
        &self,
        git: &GitSession<'_>,
        message: Option<&str>,
        branch: &str,
    ) -> Result<Option<(String, ChangeSummary)>> {
        git.stage_all()?;
        if !git.has_staged_changes()? {
            return Ok(None);
        }

        let summary = git.staged_summary()?;
        let message = match message.map(str::trim).filter(|m| !m.is_empty()) {
            Some(message) => message.to_string(),
            None => render(
                self.policy.default_commit_message_template.as_deref(),
                &summary,
                branch,
                Utc::now(),
            ),
        };

        let hash = git.commit(&message)?;
        info!(handle = %self.handle, commit = %hash, changes = %summary, "Committed");
        self.status.update(|s| s.last_commit_hash = Some(hash.clone()));
        Ok(Some((hash, summary)))
    }

    fn sync_locked(&self, git: &GitSession<'_>, origin: Origin) -> Result<SyncOutcome> {
        let branch = self.branch();
        git.fetch()?;

        if origin == Origin::Background && self.status.snapshot().conflict_detected {
            debug!(handle = %self.handle, "Conflict pending, fetched without pulling");
            return Ok(SyncOutcome::ConflictPending);
        }

        let head = git.head_commit()?;
        let (outcome, head) = match git.remote_commit(&branch)? {
            None => {
                debug!(handle = %self.handle, branch = %branch, "Remote branch does not exist yet");
                (SyncOutcome::UpToDate, head)
            }
            Some(remote) if head.as_deref() == Some(remote.as_str()) => (SyncOutcome::UpToDate, head),
            Some(_) => {
                git.pull(&branch)?;
                let head = git.head_commit()?;
                info!(handle = %self.handle, branch = %branch, head = ?head, "Pulled remote changes");
                (SyncOutcome::Pulled { head: head.clone() }, head)
            }
        };

        self.mark_synced(head);
        Ok(outcome)
    }

    fn mark_synced(&self, head: Option<String>) {
        self.status.update(|s| {
            s.last_sync_time = Some(Utc::now());
            if head.is_some() {
                s.last_commit_hash = head;
            }
            s.conflict_detected = false;
            s.last_error = None;
        });
    }

    fn record_failure(&self, err: &Error, origin: Origin) {
        let conflict = err.kind() == ErrorKind::MergeConflict;
        let message = err.to_string();
        self.status.update(|s| {
            s.last_error = Some(message);
            if conflict {
                s.conflict_detected = true;
            }
        });

        match origin {
            Origin::Background => {
                warn!(handle = %self.handle, error = %err, conflict, "Background sync failed");
            }
            Origin::Caller => {
                debug!(handle = %self.handle, error = %err, conflict, "Sync failed");
            }
        }
    }
}
