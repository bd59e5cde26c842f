//! Git fixtures driven through the `git` CLI.
//!
//! All helpers panic on failure: they are only meant for test setup.

use std::fs;
use std::path::Path;
use std::process::Command;

/// Run `git <args>` in `dir` and return trimmed stdout.
///
/// # Panics
/// Panics if git cannot be launched or exits non-zero.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("LC_ALL", "C")
        .output()
        .unwrap_or_else(|e| panic!("failed to run `git {args:?}`: {e}"));
    if !output.status.success() {
        panic!(
            "`git {args:?}` failed in {}:\n{}",
            dir.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Configure a deterministic identity and disable signing.
pub fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// Initialise a bare repository whose HEAD points at `branch`.
pub fn bare_repo(dir: &Path, branch: &str) {
    fs::create_dir_all(dir).unwrap_or_else(|e| panic!("bare_repo: {e}"));
    git(dir, &["init", "--bare", "--quiet"]);
    git(dir, &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]);
}

/// Write `content` to `relative` under `dir`, creating parent directories.
pub fn write_file(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap_or_else(|e| panic!("write_file: {e}"));
    }
    fs::write(&path, content).unwrap_or_else(|e| panic!("write_file {}: {e}", path.display()));
}

/// Stage everything and commit with `message`. Returns the new HEAD hash.
pub fn commit_all(dir: &Path, message: &str) -> String {
    git(dir, &["add", "--all"]);
    git(dir, &["commit", "--quiet", "-m", message]);
    head(dir)
}

/// Current HEAD hash.
pub fn head(dir: &Path) -> String {
    git(dir, &["rev-parse", "HEAD"])
}

/// Number of commits reachable from HEAD.
pub fn commit_count(dir: &Path) -> usize {
    git(dir, &["rev-list", "--count", "HEAD"])
        .parse()
        .unwrap_or_else(|e| panic!("commit_count: {e}"))
}

/// Subject line of the HEAD commit.
pub fn head_subject(dir: &Path) -> String {
    git(dir, &["log", "-1", "--format=%s"])
}

/// Hash of `branch` in a (possibly bare) repository, `None` if missing.
pub fn branch_tip(repo: &Path, branch: &str) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
        .current_dir(repo)
        .output()
        .unwrap_or_else(|e| panic!("branch_tip: {e}"));
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
