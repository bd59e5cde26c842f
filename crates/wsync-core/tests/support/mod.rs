//! Recording test double for `GitOperator`.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use wsync_core::{OperatorFactory, SyncPolicy, WorkspaceRegistry};
use wsync_fs::NormalizedPath;
use wsync_git::{BranchListing, ChangeSummary, Credential, Error, GitOperator, Result};

/// Knobs shared by every operator a [`FakeGit`] hands out.
#[derive(Debug, Clone, Default)]
pub struct FakeConfig {
    pub staged: bool,
    pub unpushed: usize,
    pub head: Option<String>,
    pub remote: Option<String>,
    pub push_conflict: bool,
    pub pull_conflict: bool,
    pub auth_fails: bool,
    pub commit_fails: bool,
    pub op_delay: Duration,
}

#[derive(Default)]
struct FakeState {
    config: Mutex<FakeConfig>,
    log: Mutex<Vec<&'static str>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    commits: AtomicUsize,
}

/// Factory and inspection handle for recording operators.
#[derive(Clone, Default)]
pub struct FakeGit {
    state: Arc<FakeState>,
}

impl FakeGit {
    pub fn new(config: FakeConfig) -> Self {
        let fake = Self::default();
        *fake.state.config.lock().unwrap() = config;
        fake
    }

    pub fn configure(&self, apply: impl FnOnce(&mut FakeConfig)) {
        apply(&mut self.state.config.lock().unwrap());
    }

    pub fn registry(&self) -> WorkspaceRegistry {
        WorkspaceRegistry::with_factory(Arc::new(self.clone()))
    }

    pub fn log(&self) -> Vec<&'static str> {
        self.state.log.lock().unwrap().clone()
    }

    pub fn clear_log(&self) {
        self.state.log.lock().unwrap().clear();
    }

    pub fn count(&self, op: &str) -> usize {
        self.log().iter().filter(|entry| **entry == op).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl OperatorFactory for FakeGit {
    fn create(&self, root: &NormalizedPath, _policy: &SyncPolicy) -> Box<dyn GitOperator> {
        Box::new(FakeOperator {
            state: Arc::clone(&self.state),
            root: root.clone(),
        })
    }
}

struct FakeOperator {
    state: Arc<FakeState>,
    root: NormalizedPath,
}

struct InFlight<'a>(&'a FakeState);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeOperator {
    fn enter(&self, op: &'static str) -> (InFlight<'_>, FakeConfig) {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.state.log.lock().unwrap().push(op);
        let config = self.state.config.lock().unwrap().clone();
        if !config.op_delay.is_zero() {
            thread::sleep(config.op_delay);
        }
        (InFlight(&self.state), config)
    }

    fn update(&self, apply: impl FnOnce(&mut FakeConfig)) {
        apply(&mut self.state.config.lock().unwrap());
    }
}

fn conflict(operation: &str) -> Error {
    Error::MergeConflict {
        operation: operation.into(),
        diagnostic: format!("simulated {operation} conflict"),
    }
}

impl GitOperator for FakeOperator {
    fn ensure_repository(&self, _remote_url: &str, _branch: &str) -> Result<()> {
        let _op = self.enter("ensure_repository");
        Ok(())
    }

    fn configure_remote_auth(&mut self, _credential: Option<Credential>) -> Result<()> {
        let (_op, config) = self.enter("configure_remote_auth");
        if config.auth_fails {
            return Err(Error::AuthConfiguration {
                message: "simulated".into(),
            });
        }
        Ok(())
    }

    fn stage_all(&self) -> Result<()> {
        let _op = self.enter("stage_all");
        Ok(())
    }

    fn has_staged_changes(&self) -> Result<bool> {
        let (_op, config) = self.enter("has_staged_changes");
        Ok(config.staged)
    }

    fn staged_summary(&self) -> Result<ChangeSummary> {
        let _op = self.enter("staged_summary");
        Ok(ChangeSummary {
            added: 1,
            ..Default::default()
        })
    }

    fn commit(&self, _message: &str) -> Result<String> {
        let (_op, config) = self.enter("commit");
        if config.commit_fails {
            return Err(Error::CommandFailed {
                command: "git commit".into(),
                code: Some(1),
                stderr: "simulated commit failure".into(),
            });
        }
        let n = self.state.commits.fetch_add(1, Ordering::SeqCst) + 1;
        let hash = format!("{n:040x}");
        self.update(|c| {
            c.head = Some(hash.clone());
            c.staged = false;
        });
        Ok(hash)
    }

    fn push(&self, _branch: &str) -> Result<()> {
        let (_op, config) = self.enter("push");
        if config.push_conflict {
            return Err(conflict("push"));
        }
        self.update(|c| {
            c.remote = c.head.clone();
            c.unpushed = 0;
        });
        Ok(())
    }

    fn fetch(&self) -> Result<()> {
        let _op = self.enter("fetch");
        Ok(())
    }

    fn pull(&self, _branch: &str) -> Result<()> {
        let (_op, config) = self.enter("pull");
        if config.pull_conflict {
            return Err(conflict("pull"));
        }
        self.update(|c| c.head = c.remote.clone());
        Ok(())
    }

    fn create_branch(&self, _name: &str) -> Result<()> {
        let _op = self.enter("create_branch");
        Ok(())
    }

    fn switch_branch(&self, name: &str) -> Result<()> {
        let _op = self.enter("switch_branch");
        if name == "missing" {
            return Err(Error::CommandFailed {
                command: format!("git switch {name}"),
                code: Some(128),
                stderr: format!("fatal: invalid reference: {name}"),
            });
        }
        Ok(())
    }

    fn list_branches(&self) -> Result<BranchListing> {
        let _op = self.enter("list_branches");
        Ok(BranchListing {
            current: Some("main".into()),
            local: vec!["main".into()],
            remote: vec!["origin/main".into()],
        })
    }

    fn head_commit(&self) -> Result<Option<String>> {
        let (_op, config) = self.enter("head_commit");
        Ok(config.head)
    }

    fn remote_commit(&self, _branch: &str) -> Result<Option<String>> {
        let (_op, config) = self.enter("remote_commit");
        Ok(config.remote)
    }

    fn unpushed_commits(&self, _branch: &str) -> Result<usize> {
        let (_op, config) = self.enter("unpushed_commits");
        Ok(config.unpushed)
    }

    fn git_dir(&self) -> Result<NormalizedPath> {
        Ok(self.root.join(".git"))
    }
}

/// Policy with both toggles off and a fast debounce, for driving commands by hand.
pub fn manual_policy(root: &Path) -> SyncPolicy {
    SyncPolicy::new(root, "https://example.com/repo.git", "main")
        .with_auto_commit(false)
        .with_auto_pull(false)
        .with_debounce(Duration::from_millis(100))
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    condition()
}
