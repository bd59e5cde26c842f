//! Resolving command-line options into a sync policy

use std::env;

use wsync_core::{PolicyFile, SyncPolicy, WorkspaceRegistry};
use wsync_fs::NormalizedPath;
use wsync_git::{Credential, inspect};

use crate::cli::WorkspaceArgs;
use crate::error::{CliError, Result};

const FALLBACK_BRANCH: &str = "main";

/// Build the policy described by `args`.
///
/// With `--policy` the file is authoritative. Otherwise the remote URL and
/// branch fall back to what the workspace already has configured.
pub fn resolve_policy(args: &WorkspaceArgs) -> Result<SyncPolicy> {
    if let Some(path) = &args.policy {
        let file = PolicyFile::load(&NormalizedPath::new(path))?;
        let credential_env = file
            .credential_env
            .clone()
            .unwrap_or_else(|| args.credential_env.clone());
        let credential = credential_from_env(&credential_env)?;
        return Ok(with_identity(file.into_policy(credential), args));
    }

    let remote = match &args.remote {
        Some(url) => url.clone(),
        None => inspect::configured_remote_url(&args.path, "origin")?.ok_or_else(|| {
            CliError::user(format!(
                "no remote configured for {}; pass --remote or set WSYNC_REMOTE",
                args.path.display()
            ))
        })?,
    };
    let branch = match &args.branch {
        Some(branch) => branch.clone(),
        None => inspect::checked_out_branch(&args.path)?
            .unwrap_or_else(|| FALLBACK_BRANCH.to_string()),
    };

    let mut policy = SyncPolicy::new(&args.path, remote, branch);
    if let Some(credential) = credential_from_env(&args.credential_env)? {
        policy = policy.with_credential(credential);
    }
    Ok(with_identity(policy, args))
}

/// Policy for a single command: no watcher and no timer.
pub fn one_shot_policy(args: &WorkspaceArgs) -> Result<SyncPolicy> {
    Ok(resolve_policy(args)?
        .with_auto_commit(false)
        .with_auto_pull(false))
}

/// Start a registry with one workspace under the requested handle.
pub fn open(args: &WorkspaceArgs, policy: SyncPolicy) -> Result<WorkspaceRegistry> {
    let registry = WorkspaceRegistry::new();
    registry.initialize(args.handle.as_str(), policy)?;
    Ok(registry)
}

fn with_identity(policy: SyncPolicy, args: &WorkspaceArgs) -> SyncPolicy {
    match (&args.author_name, &args.author_email) {
        (Some(name), Some(email)) => policy.with_commit_identity(name, email),
        _ => policy,
    }
}

fn credential_from_env(var: &str) -> Result<Option<Credential>> {
    match env::var(var) {
        Ok(token) if !token.is_empty() => {
            tracing::debug!(var, "Using credential from environment");
            Ok(Some(Credential::new(token)?))
        }
        _ => Ok(None),
    }
}
