//! Command implementations

mod branch;
mod commit;
mod status;
mod sync;
mod watch;

pub use branch::{run_branch_create, run_branch_list, run_branch_switch};
pub use commit::run_commit;
pub use status::run_status;
pub use sync::run_sync;
pub use watch::{WatchOptions, run_watch};

/// Abbreviate a commit hash for display.
pub(crate) fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
