//! Error types for wsync-watch

/// Result type for wsync-watch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while observing a workspace
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to watch workspace: {0}")]
    Notify(#[from] notify::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] wsync_fs::Error),
}
