//! Commit command implementation

use colored::Colorize;
use wsync_core::CommitOutcome;

use super::short;
use crate::cli::WorkspaceArgs;
use crate::context;
use crate::error::Result;

/// Run the commit command
pub fn run_commit(args: &WorkspaceArgs, message: Option<&str>, pull: bool) -> Result<()> {
    let policy = context::one_shot_policy(args)?.with_auto_pull(pull);
    let registry = context::open(args, policy)?;

    println!(
        "{} Committing {}...",
        "=>".blue().bold(),
        args.path.display().to_string().cyan()
    );
    let outcome = registry.commit_and_sync(&args.handle, message);
    registry.shutdown();

    print_outcome(&outcome?);
    Ok(())
}

pub(crate) fn print_outcome(outcome: &CommitOutcome) {
    match outcome {
        CommitOutcome::Committed { hash, summary } => {
            println!(
                "{} Committed {} ({}) and pushed",
                "OK".green().bold(),
                short(hash).yellow(),
                summary
            );
        }
        CommitOutcome::PushedExisting { commits } => {
            println!(
                "{} Pushed {} existing commit(s)",
                "OK".green().bold(),
                commits
            );
        }
        CommitOutcome::NothingToCommit => {
            println!("{} Nothing to commit", "OK".green().bold());
        }
    }
}
