//! Sync command implementation

use colored::Colorize;
use wsync_core::SyncOutcome;

use super::short;
use crate::cli::WorkspaceArgs;
use crate::context;
use crate::error::Result;

/// Run the sync command
pub fn run_sync(args: &WorkspaceArgs) -> Result<()> {
    let registry = context::open(args, context::one_shot_policy(args)?)?;

    println!(
        "{} Syncing {} with its remote...",
        "=>".blue().bold(),
        args.path.display().to_string().cyan()
    );
    let outcome = registry.sync_with_remote(&args.handle);
    registry.shutdown();

    print_outcome(&outcome?);
    Ok(())
}

pub(crate) fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::UpToDate => println!("{} Already up to date", "OK".green().bold()),
        SyncOutcome::Pulled { head } => println!(
            "{} Pulled remote changes, now at {}",
            "OK".green().bold(),
            head.as_deref().map(short).unwrap_or("(no commits)").yellow()
        ),
        SyncOutcome::ConflictPending => println!(
            "{} A conflict is pending; resolve it, then run {}",
            "!".yellow().bold(),
            "wsync sync".cyan()
        ),
    }
}
