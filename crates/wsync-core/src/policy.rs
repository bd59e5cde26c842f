//! Synchronization policy
//!
//! A [`SyncPolicy`] is captured once at initialization and never changes for
//! the lifetime of the controller (the tracked branch, which follows
//! `SwitchBranch`, lives in the controller instead).
//!
//! Policies are built in code or loaded from a [`PolicyFile`]. Policy files
//! never carry the credential; they name the environment variable holding it.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wsync_fs::{ConfigStore, NormalizedPath};
use wsync_git::{CommitIdentity, Credential, OperatorOptions};

use crate::{Error, Result};

const DEFAULT_BRANCH: &str = "main";
const DEFAULT_REMOTE: &str = "origin";
const DEFAULT_PULL_INTERVAL_SECONDS: u64 = 30;
const DEFAULT_NETWORK_TIMEOUT_SECONDS: u64 = 120;
const DEFAULT_DEBOUNCE_MILLIS: u64 = 1000;

/// Immutable configuration of one synchronized workspace.
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    /// Working copy directory
    pub workspace_root: PathBuf,

    /// Remote location, any URL git accepts
    pub repository_url: String,

    /// Branch tracked at start-up
    pub branch: String,

    /// Bearer token for HTTP(S) remotes
    pub credential: Option<Credential>,

    /// Commit settled change batches automatically
    pub auto_commit: bool,

    /// Pull from the remote on every timer tick
    pub auto_pull: bool,

    /// Seconds between timer ticks, at least 1
    pub pull_interval_seconds: u64,

    /// Treat any divergence on pull as a conflict instead of merging
    pub collaboration_mode: bool,

    /// Template for generated commit messages, see [`DEFAULT_COMMIT_TEMPLATE`](crate::DEFAULT_COMMIT_TEMPLATE)
    pub default_commit_message_template: Option<String>,

    pub remote_name: String,

    /// Identity for commits made by the engine; git config is used when `None`
    pub commit_identity: Option<CommitIdentity>,

    /// Upper bound for fetch, pull and push; 0 disables the bound
    pub network_timeout_seconds: u64,

    /// Quiet period before a change batch counts as settled
    pub debounce_millis: u64,
}

impl SyncPolicy {
    /// A policy with auto-commit and auto-pull enabled and default timings.
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        repository_url: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            repository_url: repository_url.into(),
            branch: branch.into(),
            credential: None,
            auto_commit: true,
            auto_pull: true,
            pull_interval_seconds: DEFAULT_PULL_INTERVAL_SECONDS,
            collaboration_mode: false,
            default_commit_message_template: None,
            remote_name: DEFAULT_REMOTE.to_string(),
            commit_identity: None,
            network_timeout_seconds: DEFAULT_NETWORK_TIMEOUT_SECONDS,
            debounce_millis: DEFAULT_DEBOUNCE_MILLIS,
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_auto_commit(mut self, enabled: bool) -> Self {
        self.auto_commit = enabled;
        self
    }

    pub fn with_auto_pull(mut self, enabled: bool) -> Self {
        self.auto_pull = enabled;
        self
    }

    pub fn with_pull_interval_seconds(mut self, seconds: u64) -> Self {
        self.pull_interval_seconds = seconds;
        self
    }

    pub fn with_collaboration_mode(mut self, enabled: bool) -> Self {
        self.collaboration_mode = enabled;
        self
    }

    pub fn with_commit_message_template(mut self, template: impl Into<String>) -> Self {
        self.default_commit_message_template = Some(template.into());
        self
    }

    pub fn with_remote_name(mut self, remote: impl Into<String>) -> Self {
        self.remote_name = remote.into();
        self
    }

    pub fn with_commit_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.commit_identity = Some(CommitIdentity {
            name: name.into(),
            email: email.into(),
        });
        self
    }

    pub fn with_network_timeout_seconds(mut self, seconds: u64) -> Self {
        self.network_timeout_seconds = seconds;
        self
    }

    pub fn with_debounce(mut self, quiet_period: Duration) -> Self {
        self.debounce_millis = u64::try_from(quiet_period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Reject policies that cannot drive a controller.
    ///
    /// Branch names are checked for emptiness and option-like prefixes here;
    /// full ref-name validation happens when the repository is prepared.
    pub fn validate(&self) -> Result<()> {
        if self.pull_interval_seconds == 0 {
            return Err(Error::invalid_policy("pull_interval_seconds must be at least 1"));
        }
        if self.repository_url.trim().is_empty() {
            return Err(Error::invalid_policy("repository_url is empty"));
        }
        if self.branch.trim().is_empty() {
            return Err(Error::invalid_policy("branch is empty"));
        }
        if self.branch.starts_with('-') {
            return Err(Error::invalid_policy(format!(
                "branch '{}' looks like an option",
                self.branch
            )));
        }
        if self.remote_name.trim().is_empty() || self.remote_name.starts_with('-') {
            return Err(Error::invalid_policy(format!(
                "invalid remote name '{}'",
                self.remote_name
            )));
        }
        if self.debounce_millis == 0 {
            return Err(Error::invalid_policy("debounce_millis must be at least 1"));
        }
        if let Some(identity) = &self.commit_identity
            && (identity.name.trim().is_empty() || identity.email.trim().is_empty())
        {
            return Err(Error::invalid_policy("commit identity needs a name and an email"));
        }
        Ok(())
    }

    pub fn pull_interval(&self) -> Duration {
        Duration::from_secs(self.pull_interval_seconds)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.debounce_millis)
    }

    /// Whether a background timer is needed at all.
    pub fn needs_timer(&self) -> bool {
        self.auto_commit || self.auto_pull
    }

    /// Options for the git operator serving this policy.
    pub fn operator_options(&self) -> OperatorOptions {
        OperatorOptions {
            remote: self.remote_name.clone(),
            identity: self.commit_identity.clone(),
            network_timeout: (self.network_timeout_seconds > 0)
                .then(|| Duration::from_secs(self.network_timeout_seconds)),
            fast_forward_only: self.collaboration_mode,
        }
    }
}

/// On-disk form of a [`SyncPolicy`].
///
/// ```toml
/// workspace_root = "."
/// repository_url = "https://example.com/site.git"
/// branch = "main"
/// credential_env = "WSYNC_TOKEN"
/// pull_interval_seconds = 60
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    /// Relative paths are resolved against the policy file's directory
    pub workspace_root: PathBuf,

    pub repository_url: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Environment variable holding the credential
    #[serde(default)]
    pub credential_env: Option<String>,

    #[serde(default = "default_true")]
    pub auto_commit: bool,

    #[serde(default = "default_true")]
    pub auto_pull: bool,

    #[serde(default = "default_pull_interval")]
    pub pull_interval_seconds: u64,

    #[serde(default)]
    pub collaboration_mode: bool,

    #[serde(default)]
    pub default_commit_message_template: Option<String>,

    #[serde(default = "default_remote")]
    pub remote_name: String,

    #[serde(default)]
    pub commit_identity: Option<CommitIdentity>,

    #[serde(default = "default_network_timeout")]
    pub network_timeout_seconds: u64,

    #[serde(default = "default_debounce")]
    pub debounce_millis: u64,
}

impl PolicyFile {
    /// Load a `.toml`, `.json`, `.yaml` or `.yml` policy file.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let mut file: Self = ConfigStore::new().load(path)?;

        if file.workspace_root.is_relative()
            && let Some(dir) = path.to_native().parent()
        {
            file.workspace_root = dir.join(&file.workspace_root);
        }
        Ok(file)
    }

    /// Build the policy, attaching the credential resolved by the caller.
    pub fn into_policy(self, credential: Option<Credential>) -> SyncPolicy {
        SyncPolicy {
            workspace_root: self.workspace_root,
            repository_url: self.repository_url,
            branch: self.branch,
            credential,
            auto_commit: self.auto_commit,
            auto_pull: self.auto_pull,
            pull_interval_seconds: self.pull_interval_seconds,
            collaboration_mode: self.collaboration_mode,
            default_commit_message_template: self.default_commit_message_template,
            remote_name: self.remote_name,
            commit_identity: self.commit_identity,
            network_timeout_seconds: self.network_timeout_seconds,
            debounce_millis: self.debounce_millis,
        }
    }
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_pull_interval() -> u64 {
    DEFAULT_PULL_INTERVAL_SECONDS
}

fn default_network_timeout() -> u64 {
    DEFAULT_NETWORK_TIMEOUT_SECONDS
}

fn default_debounce() -> u64 {
    DEFAULT_DEBOUNCE_MILLIS
}
