//! Error types for wsync-core

use wsync_git::ErrorKind;

use crate::WorkspaceHandle;

/// Result type for wsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No controller is registered under the handle
    #[error("Workspace not found: {handle}")]
    NotFound { handle: WorkspaceHandle },

    /// Policy rejected before anything touched the workspace
    #[error("Invalid sync policy: {message}")]
    InvalidPolicy { message: String },

    /// The controller was stopped while the caller still held it
    #[error("Workspace {handle} is no longer active")]
    NotActive { handle: WorkspaceHandle },

    /// A background thread could not be started
    #[error("Failed to start {worker} thread: {source}")]
    Spawn {
        worker: &'static str,
        #[source]
        source: std::io::Error,
    },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from wsync-fs
    #[error(transparent)]
    Fs(#[from] wsync_fs::Error),

    /// Git error from wsync-git
    #[error(transparent)]
    Git(#[from] wsync_git::Error),

    /// Watcher error from wsync-watch
    #[error(transparent)]
    Watch(#[from] wsync_watch::Error),
}

impl Error {
    /// Project this error onto the caller-visible taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::NotActive { .. } => ErrorKind::NotFound,
            Self::InvalidPolicy { .. } | Self::Fs(_) | Self::Watch(_) => {
                ErrorKind::InvalidWorkspace
            }
            Self::Spawn { .. } => ErrorKind::GitFailure,
            Self::Git(e) => e.kind(),
        }
    }

    pub(crate) fn invalid_policy(message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn git_errors_keep_their_kind() {
        let err: Error = wsync_git::Error::MergeConflict {
            operation: "push".into(),
            diagnostic: "! [rejected] main -> main (fetch first)".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::MergeConflict);
        assert!(err.to_string().contains("[rejected]"));
    }

    #[test]
    fn unknown_and_stopped_handles_are_not_found() {
        let unknown = Error::NotFound {
            handle: WorkspaceHandle::new("w9"),
        };
        let stopped = Error::NotActive {
            handle: WorkspaceHandle::new("w1"),
        };
        assert_eq!(unknown.kind(), ErrorKind::NotFound);
        assert_eq!(stopped.kind(), ErrorKind::NotFound);
        assert!(unknown.to_string().contains("w9"));
    }

    #[test]
    fn lock_contention_is_an_invalid_workspace() {
        let err: Error = wsync_fs::Error::LockFailed {
            path: "/w/.git/wsync.lock".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidWorkspace);
    }
}
