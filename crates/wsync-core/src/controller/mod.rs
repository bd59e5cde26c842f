//! Per-workspace synchronization state machine
//!
//! A [`SyncController`] owns one workspace from `Initialize` to `Stop`:
//!
//! ```text
//! Uninitialized -> Initializing -> Active -> Stopping -> Stopped
//! ```
//!
//! While active it turns settled change batches and periodic ticks into git
//! operations and exposes the caller-facing commands. Every git call for the
//! workspace, caller-invoked or background, runs under one mutex, so a manual
//! commit never interleaves with a periodic pull.
//!
//! Failures do not leave `Active`. A rejected push or a merge conflict latches
//! `conflict_detected` in the status; while it is set, background ticks only
//! fetch and background commits are skipped, until a successful caller-invoked
//! sync, a branch switch, or [`SyncController::reset_conflict`] clears it.

mod message;
mod shared;
mod workers;

use std::sync::{Arc, Mutex};

use tracing::{debug, info};
use wsync_fs::{NormalizedPath, WorkspaceLock};
use wsync_git::{BranchListing, ChangeSummary};

pub use message::DEFAULT_COMMIT_TEMPLATE;

use self::shared::{GitSlot, Origin, Shared};
use self::workers::Workers;
use crate::locking::lock;
use crate::{LifecycleState, OperatorFactory, Result, SyncPolicy, SyncStatus, WorkspaceHandle};

/// Name of the advisory lock file inside the git directory.
const LOCK_FILE: &str = "wsync.lock";

/// Result of a `CommitAndSync`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new commit was created and pushed
    Committed { hash: String, summary: ChangeSummary },

    /// Nothing was staged, but earlier local commits were pushed
    PushedExisting { commits: usize },

    /// Nothing staged and nothing unpushed
    NothingToCommit,
}

/// Result of a `SyncWithRemote`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// HEAD already matches the remote, or the remote branch does not exist yet
    UpToDate,

    /// Remote changes were merged
    Pulled { head: Option<String> },

    /// Only fetched, because a conflict is waiting for the user
    ConflictPending,
}

/// Synchronizer for one workspace.
pub struct SyncController {
    shared: Arc<Shared>,
    workers: Mutex<Workers>,
}

impl SyncController {
    /// Validate the policy, prepare the repository and start background work.
    ///
    /// # Errors
    ///
    /// - `InvalidPolicy` for unusable settings
    /// - `InvalidWorkspace` kinds when the root is missing, cannot become a
    ///   repository, or is already locked by another synchronizer
    /// - `AuthConfigurationFailed` when the credential cannot be installed
    pub fn start(
        handle: WorkspaceHandle,
        policy: SyncPolicy,
        factory: &dyn OperatorFactory,
    ) -> Result<Self> {
        info!(handle = %handle, root = %policy.workspace_root.display(), "Initializing workspace");
        policy.validate()?;

        let root = NormalizedPath::canonical_dir(&policy.workspace_root)?;
        let mut operator = factory.create(&root, &policy);

        operator.ensure_repository(&policy.repository_url, &policy.branch)?;
        let lock_path = operator.git_dir()?.join(LOCK_FILE);
        let workspace_lock = WorkspaceLock::acquire(lock_path)?;
        operator.configure_remote_auth(policy.credential.clone())?;

        let initial = SyncStatus {
            active: true,
            branch: policy.branch.clone(),
            last_commit_hash: operator.head_commit()?,
            ..Default::default()
        };

        let shared = Arc::new(Shared::new(
            handle,
            policy,
            root,
            GitSlot {
                operator,
                lock: Some(workspace_lock),
            },
            initial,
        ));

        let controller = Self {
            shared: Arc::clone(&shared),
            workers: Mutex::new(Workers::default()),
        };

        shared.set_state(LifecycleState::Active);
        // On failure the controller is dropped here, which stops it
        let workers = Workers::spawn(&shared)?;
        *lock(&controller.workers) = workers;

        info!(
            handle = %shared.handle,
            branch = %shared.branch(),
            auto_commit = shared.policy.auto_commit,
            auto_pull = shared.policy.auto_pull,
            "Workspace active"
        );
        Ok(controller)
    }

    pub fn handle(&self) -> &WorkspaceHandle {
        &self.shared.handle
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.shared.policy
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.shared.root
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// Branch the controller currently tracks.
    pub fn branch(&self) -> String {
        self.shared.branch()
    }

    /// Consistent snapshot of the workspace status.
    pub fn status(&self) -> SyncStatus {
        self.shared.status()
    }

    /// Whether the OS watch is still open.
    pub fn is_watching(&self) -> bool {
        lock(&self.workers).is_watching()
    }

    /// Whether the periodic timer is still scheduled.
    pub fn has_timer(&self) -> bool {
        lock(&self.workers).has_timer()
    }

    /// Stage everything, commit, and push.
    ///
    /// With `auto_pull` enabled the remote branch is merged first. An empty
    /// staged diff never produces a commit; earlier unpushed commits are still
    /// pushed.
    pub fn commit_and_sync(&self, message: Option<&str>) -> Result<CommitOutcome> {
        let git = self.shared.session()?;
        self.shared.commit_and_sync(&git, message, Origin::Caller)
    }

    /// Fetch, and merge the remote branch if it moved.
    ///
    /// A success clears a latched conflict.
    pub fn sync_with_remote(&self) -> Result<SyncOutcome> {
        let git = self.shared.session()?;
        self.shared.sync_with_remote(&git, Origin::Caller)
    }

    /// Create a branch at HEAD without switching to it.
    pub fn create_branch(&self, name: &str) -> Result<()> {
        let git = self.shared.session()?;
        git.create_branch(name)?;
        info!(handle = %self.shared.handle, branch = %name, "Created branch");
        Ok(())
    }

    /// Check out `name` and track it from now on. Clears a latched conflict.
    pub fn switch_branch(&self, name: &str) -> Result<()> {
        let git = self.shared.session()?;
        git.switch_branch(name)?;
        self.shared.set_branch(name);
        let head = git.head_commit()?;

        self.shared.update_status(|s| {
            s.branch = name.to_string();
            s.last_commit_hash = head;
            s.conflict_detected = false;
            s.last_error = None;
        });
        info!(handle = %self.shared.handle, branch = %name, "Switched branch");
        Ok(())
    }

    pub fn list_branches(&self) -> Result<BranchListing> {
        let git = self.shared.session()?;
        Ok(git.list_branches()?)
    }

    /// Clear a latched conflict after the user resolved it by hand.
    pub fn reset_conflict(&self) {
        self.shared.update_status(|s| {
            s.conflict_detected = false;
            s.last_error = None;
        });
        debug!(handle = %self.shared.handle, "Conflict flag reset");
    }

    /// Cancel the timer, close the watcher and mark the workspace inactive.
    ///
    /// Idempotent. Does not wait for an in-flight git operation; it finishes
    /// on its own and no new background operation starts afterwards.
    pub fn stop(&self) {
        if !self.shared.begin_stop() {
            return;
        }
        info!(handle = %self.shared.handle, "Stopping workspace");

        lock(&self.workers).cancel();
        self.shared.update_status(|s| s.active = false);
        self.shared.set_state(LifecycleState::Stopped);
        self.shared.release_lock_if_idle();

        info!(handle = %self.shared.handle, "Workspace stopped");
    }

    /// Wait for background threads and any in-flight git operation to finish.
    ///
    /// Only meaningful after [`stop`](Self::stop).
    pub fn join(&self) {
        lock(&self.workers).join();
        self.shared.wait_idle();
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("handle", &self.shared.handle)
            .field("root", &self.shared.root)
            .field("state", &self.shared.state())
            .finish()
    }
}
