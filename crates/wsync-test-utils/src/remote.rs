//! [`RemoteFixture`]: a bare remote and its working copies.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::git::{bare_repo, commit_all, configure_identity, git, write_file};

/// A temporary bare remote with helpers for creating working copies.
///
/// # Example
///
/// ```rust,no_run
/// use wsync_test_utils::RemoteFixture;
///
/// let fixture = RemoteFixture::seeded("main");
/// let w1 = fixture.clone_into("w1");
/// assert!(w1.join("README.md").exists());
/// ```
pub struct RemoteFixture {
    temp_dir: TempDir,
    branch: String,
}

impl RemoteFixture {
    /// A bare remote with no commits at all.
    pub fn empty(branch: &str) -> Self {
        let temp_dir = TempDir::new().unwrap_or_else(|e| panic!("RemoteFixture: {e}"));
        bare_repo(&temp_dir.path().join("remote.git"), branch);
        Self {
            temp_dir,
            branch: branch.to_string(),
        }
    }

    /// A bare remote whose `branch` holds one commit with a README.
    pub fn seeded(branch: &str) -> Self {
        let fixture = Self::empty(branch);
        let seed = fixture.temp_dir.path().join("seed");
        fs::create_dir_all(&seed).unwrap_or_else(|e| panic!("RemoteFixture: {e}"));
        git(&seed, &["init", "--quiet"]);
        git(&seed, &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]);
        configure_identity(&seed);
        write_file(&seed, "README.md", "# Seed\n");
        commit_all(&seed, "Initial commit");
        git(&seed, &["remote", "add", "origin", &fixture.url()]);
        git(&seed, &["push", "--quiet", "origin", branch]);
        fixture
    }

    /// Path of the bare repository.
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join("remote.git")
    }

    /// URL usable as a git remote (a local path).
    pub fn url(&self) -> String {
        self.path().to_string_lossy().into_owned()
    }

    /// Scratch directory next to the remote.
    pub fn scratch(&self, name: &str) -> PathBuf {
        let dir = self.temp_dir.path().join(name);
        fs::create_dir_all(&dir).unwrap_or_else(|e| panic!("scratch: {e}"));
        dir
    }

    /// Clone the remote into a sibling directory with an identity configured.
    pub fn clone_into(&self, name: &str) -> PathBuf {
        let dest = self.temp_dir.path().join(name);
        git(
            self.temp_dir.path(),
            &["clone", "--quiet", &self.url(), &dest.to_string_lossy()],
        );
        configure_identity(&dest);
        dest
    }

    /// Default branch name.
    pub fn branch(&self) -> &str {
        &self.branch
    }
}

/// Commit a change directly in `clone` and push it, simulating another writer.
pub fn push_from(clone: &Path, relative: &str, content: &str, branch: &str) -> String {
    write_file(clone, relative, content);
    let head = commit_all(clone, &format!("Update {relative}"));
    git(clone, &["push", "--quiet", "origin", branch]);
    head
}
