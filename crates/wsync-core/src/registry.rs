//! Directory of live controllers
//!
//! The registry is an ordinary value owned by the process root and handed to
//! whoever needs it. There is no global instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use wsync_git::BranchListing;

use crate::locking::lock;
use crate::{
    CliOperatorFactory, CommitOutcome, Error, LifecycleState, OperatorFactory, Result,
    SyncController, SyncOutcome, SyncPolicy, SyncStatus, WorkspaceHandle,
};

/// Maps workspace handles to their controllers.
///
/// Re-initializing a live handle stops the old controller, waits for its
/// in-flight git operation, and replaces it. `initialize` calls are
/// serialized, so two concurrent initializations of one handle never both
/// survive.
pub struct WorkspaceRegistry {
    controllers: Mutex<HashMap<WorkspaceHandle, Arc<SyncController>>>,
    factory: Arc<dyn OperatorFactory>,
    init_gate: Mutex<()>,
}

impl WorkspaceRegistry {
    /// A registry whose controllers drive the `git` binary.
    pub fn new() -> Self {
        Self::with_factory(Arc::new(CliOperatorFactory))
    }

    pub fn with_factory(factory: Arc<dyn OperatorFactory>) -> Self {
        Self {
            controllers: Mutex::new(HashMap::new()),
            factory,
            init_gate: Mutex::new(()),
        }
    }

    /// Start synchronizing a workspace under `handle`.
    pub fn initialize(
        &self,
        handle: impl Into<WorkspaceHandle>,
        policy: SyncPolicy,
    ) -> Result<Arc<SyncController>> {
        let handle = handle.into();
        let _gate = lock(&self.init_gate);

        if let Some(previous) = self.remove(handle.as_str()) {
            warn!(handle = %handle, "Re-initializing active workspace, replacing controller");
            previous.stop();
            previous.join();
        }

        let controller = Arc::new(SyncController::start(
            handle.clone(),
            policy,
            self.factory.as_ref(),
        )?);
        lock(&self.controllers).insert(handle, Arc::clone(&controller));
        Ok(controller)
    }

    /// The controller registered under `handle`.
    pub fn get(&self, handle: &str) -> Result<Arc<SyncController>> {
        lock(&self.controllers)
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                handle: WorkspaceHandle::new(handle),
            })
    }

    pub fn contains(&self, handle: &str) -> bool {
        lock(&self.controllers).contains_key(handle)
    }

    /// Handles of every live workspace, sorted.
    pub fn handles(&self) -> Vec<WorkspaceHandle> {
        let mut handles: Vec<_> = lock(&self.controllers).keys().cloned().collect();
        handles.sort();
        handles
    }

    /// Lifecycle state for `handle`; unknown handles are `Uninitialized`.
    pub fn state(&self, handle: &str) -> LifecycleState {
        self.get(handle)
            .map(|c| c.state())
            .unwrap_or(LifecycleState::Uninitialized)
    }

    pub fn commit_and_sync(&self, handle: &str, message: Option<&str>) -> Result<CommitOutcome> {
        self.get(handle)?.commit_and_sync(message)
    }

    pub fn sync_with_remote(&self, handle: &str) -> Result<SyncOutcome> {
        self.get(handle)?.sync_with_remote()
    }

    pub fn create_branch(&self, handle: &str, name: &str) -> Result<()> {
        self.get(handle)?.create_branch(name)
    }

    pub fn switch_branch(&self, handle: &str, name: &str) -> Result<()> {
        self.get(handle)?.switch_branch(name)
    }

    pub fn list_branches(&self, handle: &str) -> Result<BranchListing> {
        self.get(handle)?.list_branches()
    }

    pub fn status(&self, handle: &str) -> Result<SyncStatus> {
        Ok(self.get(handle)?.status())
    }

    pub fn reset_conflict(&self, handle: &str) -> Result<()> {
        self.get(handle)?.reset_conflict();
        Ok(())
    }

    /// Stop and forget `handle`. Unknown handles are a no-op.
    pub fn stop(&self, handle: &str) {
        if let Some(controller) = self.remove(handle) {
            controller.stop();
        }
    }

    /// Stop every workspace and wait for their threads, for process shutdown.
    pub fn shutdown(&self) {
        let controllers: Vec<_> = lock(&self.controllers).drain().map(|(_, c)| c).collect();
        if controllers.is_empty() {
            return;
        }
        info!(count = controllers.len(), "Shutting down all workspaces");
        for controller in &controllers {
            controller.stop();
        }
        for controller in &controllers {
            controller.join();
        }
    }

    fn remove(&self, handle: &str) -> Option<Arc<SyncController>> {
        lock(&self.controllers).remove(handle)
    }
}

impl Default for WorkspaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkspaceRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
