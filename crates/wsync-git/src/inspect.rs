//! Read-only repository inspection through git2.
//!
//! Each function takes an already opened repository; callers open a fresh
//! handle per operation so state written by the git binary is always seen.

use std::path::Path;

use git2::{BranchType, Delta, DiffFindOptions, ErrorCode, Oid, Repository, Tree};

use crate::{BranchListing, ChangeSummary, Result};

/// Hash of HEAD, or `None` while the current branch is unborn.
pub fn head_commit(repo: &Repository) -> Result<Option<String>> {
    Ok(head_oid(repo)?.map(|oid| oid.to_string()))
}

/// Hash of `refs/remotes/<remote>/<branch>`, or `None` if that ref does not exist.
pub fn remote_commit(repo: &Repository, remote: &str, branch: &str) -> Result<Option<String>> {
    Ok(remote_oid(repo, remote, branch)?.map(|oid| oid.to_string()))
}

/// Name HEAD points at, following a symbolic HEAD even when the branch is unborn.
pub fn current_branch(repo: &Repository) -> Result<Option<String>> {
    let head = repo.find_reference("HEAD")?;
    Ok(head
        .symbolic_target()
        .and_then(|target| target.strip_prefix("refs/heads/"))
        .map(str::to_string))
}

/// URL of `remote` in the repository at `root`.
///
/// `None` when `root` is not a repository or the remote is not configured.
pub fn configured_remote_url(root: &Path, remote: &str) -> Result<Option<String>> {
    let repo = match Repository::open(root) {
        Ok(repo) => repo,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match repo.find_remote(remote) {
        Ok(found) => Ok(found.url().map(str::to_string)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Branch checked out in the repository at `root`, `None` when `root` is not a
/// repository or HEAD is detached.
pub fn checked_out_branch(root: &Path) -> Result<Option<String>> {
    match Repository::open(root) {
        Ok(repo) => current_branch(&repo),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Local and remote-tracking branches.
pub fn list_branches(repo: &Repository) -> Result<BranchListing> {
    let mut local = branch_names(repo, BranchType::Local)?;
    let mut remote: Vec<String> = branch_names(repo, BranchType::Remote)?
        .into_iter()
        .filter(|name| !name.ends_with("/HEAD"))
        .collect();
    local.sort();
    remote.sort();

    Ok(BranchListing {
        current: current_branch(repo)?,
        local,
        remote,
    })
}

/// Count staged changes between the HEAD tree and the index.
pub fn staged_summary(repo: &Repository) -> Result<ChangeSummary> {
    let head_tree = head_tree(repo)?;
    let mut diff = repo.diff_tree_to_index(head_tree.as_ref(), None, None)?;

    let mut find = DiffFindOptions::new();
    find.renames(true);
    diff.find_similar(Some(&mut find))?;

    let mut summary = ChangeSummary::default();
    for delta in diff.deltas() {
        match delta.status() {
            Delta::Added | Delta::Copied => summary.added += 1,
            Delta::Deleted => summary.deleted += 1,
            Delta::Renamed => summary.renamed += 1,
            Delta::Unmodified | Delta::Ignored | Delta::Untracked => {}
            _ => summary.modified += 1,
        }
    }
    Ok(summary)
}

/// Whether anything is staged at all.
pub fn has_staged_changes(repo: &Repository) -> Result<bool> {
    let head_tree = head_tree(repo)?;
    let diff = repo.diff_tree_to_index(head_tree.as_ref(), None, None)?;
    Ok(diff.deltas().len() > 0)
}

/// Commits reachable from HEAD but not from the remote-tracking branch.
pub fn unpushed_commits(repo: &Repository, remote: &str, branch: &str) -> Result<usize> {
    let Some(head) = head_oid(repo)? else {
        return Ok(0);
    };

    match remote_oid(repo, remote, branch)? {
        Some(upstream) => Ok(repo.graph_ahead_behind(head, upstream)?.0),
        None => {
            let mut revwalk = repo.revwalk()?;
            revwalk.push(head)?;
            Ok(revwalk.count())
        }
    }
}

fn head_oid(repo: &Repository) -> Result<Option<Oid>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn head_tree(repo: &Repository) -> Result<Option<Tree<'_>>> {
    match head_oid(repo)? {
        Some(oid) => Ok(Some(repo.find_commit(oid)?.tree()?)),
        None => Ok(None),
    }
}

fn remote_oid(repo: &Repository, remote: &str, branch: &str) -> Result<Option<Oid>> {
    match repo.find_reference(&format!("refs/remotes/{remote}/{branch}")) {
        Ok(reference) => Ok(Some(reference.peel_to_commit()?.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn branch_names(repo: &Repository, kind: BranchType) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in repo.branches(Some(kind))? {
        let (branch, _) = entry?;
        if let Some(name) = branch.name()? {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
