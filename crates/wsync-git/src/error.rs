//! Error types for wsync-git

use std::path::PathBuf;
use std::time::Duration;

/// Result type for wsync-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wsync-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid workspace at {path}: {reason}")]
    InvalidWorkspace { path: PathBuf, reason: String },

    #[error("Remote authentication could not be configured: {message}")]
    AuthConfiguration { message: String },

    #[error("Merge conflict during {operation}: {diagnostic}")]
    MergeConflict {
        operation: String,
        diagnostic: String,
    },

    #[error("`{command}` exited with {}: {stderr}", describe_exit(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid branch name: {name}")]
    InvalidBranchName { name: String },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] wsync_fs::Error),
}

/// Failure taxonomy visible to callers of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    /// Path missing, or not a repository and cannot become one
    InvalidWorkspace,
    /// Credential rejected or malformed
    AuthConfigurationFailed,
    /// Divergent history reported by git (merge conflict or rejected push)
    MergeConflict,
    /// Any other non-zero exit or library failure
    GitFailure,
    /// Unknown or stopped workspace handle
    NotFound,
    /// A network operation exceeded its time budget
    Timeout,
}

impl Error {
    /// Project this error onto the caller-visible taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidWorkspace { .. } | Self::Fs(_) => ErrorKind::InvalidWorkspace,
            Self::AuthConfiguration { .. } => ErrorKind::AuthConfigurationFailed,
            Self::MergeConflict { .. } => ErrorKind::MergeConflict,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::CommandFailed { .. }
            | Self::Spawn { .. }
            | Self::InvalidBranchName { .. }
            | Self::Git(_) => ErrorKind::GitFailure,
        }
    }

    /// Shorthand for an invalid workspace error.
    pub fn invalid_workspace(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidWorkspace {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidWorkspace => "InvalidWorkspace",
            Self::AuthConfigurationFailed => "AuthConfigurationFailed",
            Self::MergeConflict => "MergeConflict",
            Self::GitFailure => "GitFailure",
            Self::NotFound => "NotFound",
            Self::Timeout => "Timeout",
        };
        f.write_str(name)
    }
}
