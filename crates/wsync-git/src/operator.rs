//! Operator trait for synchronous git actions

use serde::{Deserialize, Serialize};

use crate::{Credential, Result};

/// Branches visible from a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchListing {
    /// Branch HEAD points at (including an unborn branch), `None` when detached
    pub current: Option<String>,

    /// Local branch names, sorted
    pub local: Vec<String>,

    /// Remote-tracking branch names such as `origin/main`, sorted
    pub remote: Vec<String>,
}

/// Counts of staged changes relative to HEAD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub renamed: usize,
}

impl ChangeSummary {
    pub fn total(&self) -> usize {
        self.added + self.modified + self.deleted + self.renamed
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl std::fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} added, {} modified, {} deleted",
            self.added, self.modified, self.deleted
        )?;
        if self.renamed > 0 {
            write!(f, ", {} renamed", self.renamed)?;
        }
        Ok(())
    }
}

/// Author and committer identity for commits made by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

/// One narrow operation per logical git action.
///
/// Implementations are not required to be thread-safe beyond `Send`; callers
/// serialize all use of one operator behind a per-workspace lock.
pub trait GitOperator: Send {
    /// Make sure the workspace is a repository with the remote configured.
    ///
    /// Initializes a fresh repository whose unborn HEAD points at `branch`
    /// when the directory is not yet one.
    fn ensure_repository(&self, remote_url: &str, branch: &str) -> Result<()>;

    /// Install (or clear) the credential used for network operations.
    fn configure_remote_auth(&mut self, credential: Option<Credential>) -> Result<()>;

    /// Stage every change in the working tree, including deletions.
    fn stage_all(&self) -> Result<()>;

    /// Whether the index differs from HEAD.
    fn has_staged_changes(&self) -> Result<bool>;

    /// Per-kind counts of staged changes, with rename detection.
    fn staged_summary(&self) -> Result<ChangeSummary>;

    /// Commit the index and return the new HEAD hash.
    fn commit(&self, message: &str) -> Result<String>;

    /// Push `branch` to the same-named remote branch. Never forces.
    fn push(&self, branch: &str) -> Result<()>;

    /// Update remote-tracking refs.
    fn fetch(&self) -> Result<()>;

    /// Merge the remote `branch` into the current branch.
    fn pull(&self, branch: &str) -> Result<()>;

    /// Create a local branch at HEAD without switching to it.
    fn create_branch(&self, name: &str) -> Result<()>;

    /// Check out `name`, creating a tracking branch when only the remote has it.
    fn switch_branch(&self, name: &str) -> Result<()>;

    fn list_branches(&self) -> Result<BranchListing>;

    /// Hash of HEAD, `None` before the first commit.
    fn head_commit(&self) -> Result<Option<String>>;

    /// Hash of the remote-tracking ref for `branch`, `None` when the remote lacks it.
    fn remote_commit(&self, branch: &str) -> Result<Option<String>>;

    /// Number of commits on HEAD that the remote `branch` does not have.
    fn unpushed_commits(&self, branch: &str) -> Result<usize>;

    /// Path of the repository's git directory.
    fn git_dir(&self) -> Result<wsync_fs::NormalizedPath>;
}
