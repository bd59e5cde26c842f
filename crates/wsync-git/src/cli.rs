//! Git operator backed by the `git` binary.

use std::time::Duration;

use git2::{ErrorCode, Repository};
use wsync_fs::NormalizedPath;

use crate::command::GitCommand;
use crate::diagnostics::{is_pull_conflict, is_push_rejection};
use crate::operator::{BranchListing, ChangeSummary, CommitIdentity, GitOperator};
use crate::{Credential, Error, Result, inspect};

/// Settings that shape how the operator talks to git.
#[derive(Debug, Clone)]
pub struct OperatorOptions {
    /// Remote name used for fetch, pull and push
    pub remote: String,

    /// Identity for commits and merge commits; git config is used when `None`
    pub identity: Option<CommitIdentity>,

    /// Upper bound for fetch, pull and push
    pub network_timeout: Option<Duration>,

    /// Refuse merge commits on pull; any divergence is reported as a conflict
    pub fast_forward_only: bool,
}

impl Default for OperatorOptions {
    fn default() -> Self {
        Self {
            remote: "origin".into(),
            identity: None,
            network_timeout: Some(Duration::from_secs(120)),
            fast_forward_only: false,
        }
    }
}

/// Operator for a single working copy.
///
/// Mutations and network operations run through the `git` binary so merges,
/// hooks and rename detection behave exactly as they do for a user. Queries
/// open the repository with git2.
pub struct CliGitOperator {
    root: NormalizedPath,
    options: OperatorOptions,
    credential: Option<Credential>,
}

impl CliGitOperator {
    pub fn new(root: NormalizedPath, options: OperatorOptions) -> Self {
        Self {
            root,
            options,
            credential: None,
        }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    fn open(&self) -> Result<Repository> {
        Ok(Repository::open(self.root.to_native())?)
    }

    fn git(&self) -> GitCommand {
        GitCommand::new(self.root.to_native())
    }

    /// A command carrying the commit identity, for anything that may create commits.
    fn git_with_identity(&self) -> GitCommand {
        let cmd = self.git();
        match &self.options.identity {
            Some(identity) => cmd.args([
                "-c".to_string(),
                format!("user.name={}", identity.name),
                "-c".to_string(),
                format!("user.email={}", identity.email),
            ]),
            None => cmd,
        }
    }

    /// Attach the credential and timeout to a network command.
    fn networked(&self, cmd: GitCommand) -> GitCommand {
        let cmd = cmd.timeout(self.options.network_timeout);
        match &self.credential {
            Some(credential) => cmd.envs(credential.git_env()),
            None => cmd,
        }
    }

    fn redact(&self, text: String) -> String {
        match &self.credential {
            Some(credential) => credential.redact(&text),
            None => text,
        }
    }

    /// Run a network command, redacting the credential from any failure text.
    fn run_networked(&self, cmd: GitCommand) -> Result<crate::GitOutput> {
        let cmd = self.networked(cmd);
        let output = cmd.output()?;
        if output.success() {
            return Ok(output);
        }
        Err(match cmd.failure(&output) {
            Error::CommandFailed {
                command,
                code,
                stderr,
            } => Error::CommandFailed {
                command,
                code,
                stderr: self.redact(stderr),
            },
            other => other,
        })
    }

    fn validate_branch(name: &str) -> Result<()> {
        let valid = !name.starts_with('-') && git2::Branch::name_is_valid(name).unwrap_or(false);
        if valid {
            Ok(())
        } else {
            Err(Error::InvalidBranchName {
                name: name.to_string(),
            })
        }
    }

    fn configure_remote(&self, repo: &Repository, url: &str) -> Result<()> {
        let remote = self.options.remote.as_str();
        match repo.find_remote(remote) {
            Ok(existing) if existing.url() == Some(url) => Ok(()),
            Ok(_) => {
                self.git().args(["remote", "set-url", remote, url]).run()?;
                tracing::info!(remote = %remote, "Updated remote URL");
                Ok(())
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                self.git().args(["remote", "add", remote, url]).run()?;
                tracing::info!(remote = %remote, "Added remote");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl GitOperator for CliGitOperator {
    fn ensure_repository(&self, remote_url: &str, branch: &str) -> Result<()> {
        if !self.root.is_dir() {
            return Err(Error::invalid_workspace(
                self.root.to_native(),
                "directory does not exist",
            ));
        }
        Self::validate_branch(branch)?;

        let repo = match Repository::open(self.root.to_native()) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                tracing::info!(root = %self.root, branch = %branch, "Initializing repository");
                self.git().arg("init").run().map_err(|e| {
                    Error::invalid_workspace(self.root.to_native(), e.to_string())
                })?;
                self.git()
                    .args(["symbolic-ref".to_string(), "HEAD".to_string(), format!("refs/heads/{branch}")])
                    .run()?;
                self.open()?
            }
            Err(e) => {
                return Err(Error::invalid_workspace(
                    self.root.to_native(),
                    e.message().to_string(),
                ));
            }
        };

        if repo.is_bare() {
            return Err(Error::invalid_workspace(
                self.root.to_native(),
                "bare repositories have no working tree",
            ));
        }

        self.configure_remote(&repo, remote_url)
    }

    fn configure_remote_auth(&mut self, credential: Option<Credential>) -> Result<()> {
        let repo = self.open()?;
        let remote = repo
            .find_remote(&self.options.remote)
            .map_err(|_| Error::AuthConfiguration {
                message: format!("remote '{}' is not configured", self.options.remote),
            })?;

        if credential.is_some() {
            let url = remote.url().unwrap_or_default();
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(Error::AuthConfiguration {
                    message: format!(
                        "a credential was supplied but remote '{}' is not an HTTP(S) URL",
                        self.options.remote
                    ),
                });
            }
        }

        tracing::debug!(
            remote = %self.options.remote,
            authenticated = credential.is_some(),
            "Configured remote authentication"
        );
        self.credential = credential;
        Ok(())
    }

    fn stage_all(&self) -> Result<()> {
        self.git().args(["add", "--all"]).run()?;
        Ok(())
    }

    fn has_staged_changes(&self) -> Result<bool> {
        inspect::has_staged_changes(&self.open()?)
    }

    fn staged_summary(&self) -> Result<ChangeSummary> {
        inspect::staged_summary(&self.open()?)
    }

    fn commit(&self, message: &str) -> Result<String> {
        self.git_with_identity()
            .args(["commit", "--quiet", "-m", message])
            .run()?;

        self.head_commit()?.ok_or_else(|| Error::CommandFailed {
            command: "git commit".into(),
            code: Some(0),
            stderr: "HEAD is unborn after commit".into(),
        })
    }

    fn push(&self, branch: &str) -> Result<()> {
        Self::validate_branch(branch)?;
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let cmd = self
            .git()
            .args(["push".to_string(), self.options.remote.clone(), refspec]);

        match self.run_networked(cmd) {
            Err(Error::CommandFailed { stderr, .. }) if is_push_rejection(&stderr) => {
                Err(Error::MergeConflict {
                    operation: "push".into(),
                    diagnostic: stderr,
                })
            }
            other => other.map(|_| ()),
        }
    }

    fn fetch(&self) -> Result<()> {
        let cmd = self
            .git()
            .args(["fetch".to_string(), "--prune".to_string(), self.options.remote.clone()]);
        self.run_networked(cmd)?;
        Ok(())
    }

    fn pull(&self, branch: &str) -> Result<()> {
        Self::validate_branch(branch)?;
        let strategy = if self.options.fast_forward_only {
            "--ff-only"
        } else {
            "--no-rebase"
        };
        let cmd = self.git_with_identity().args([
            "pull".to_string(),
            strategy.to_string(),
            "--no-edit".to_string(),
            self.options.remote.clone(),
            branch.to_string(),
        ]);

        match self.run_networked(cmd) {
            Err(Error::CommandFailed { stderr, .. }) if is_pull_conflict(&stderr) => {
                Err(Error::MergeConflict {
                    operation: "pull".into(),
                    diagnostic: stderr,
                })
            }
            other => other.map(|_| ()),
        }
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        Self::validate_branch(name)?;
        self.git().args(["branch", name]).run()?;
        Ok(())
    }

    fn switch_branch(&self, name: &str) -> Result<()> {
        Self::validate_branch(name)?;
        self.git().args(["switch", name]).run()?;
        Ok(())
    }

    fn list_branches(&self) -> Result<BranchListing> {
        inspect::list_branches(&self.open()?)
    }

    fn head_commit(&self) -> Result<Option<String>> {
        inspect::head_commit(&self.open()?)
    }

    fn remote_commit(&self, branch: &str) -> Result<Option<String>> {
        inspect::remote_commit(&self.open()?, &self.options.remote, branch)
    }

    fn unpushed_commits(&self, branch: &str) -> Result<usize> {
        inspect::unpushed_commits(&self.open()?, &self.options.remote, branch)
    }

    fn git_dir(&self) -> Result<NormalizedPath> {
        Ok(NormalizedPath::new(self.open()?.path()))
    }
}
