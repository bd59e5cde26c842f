//! Status command implementation

use colored::Colorize;
use wsync_core::SyncStatus;

use super::short;
use crate::cli::WorkspaceArgs;
use crate::context;
use crate::error::Result;

/// Run the status command
pub fn run_status(args: &WorkspaceArgs, json: bool) -> Result<()> {
    let registry = context::open(args, context::one_shot_policy(args)?)?;
    let status = registry.status(&args.handle);
    registry.shutdown();
    let status = status?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&args.path.display().to_string(), &status);
    }
    Ok(())
}

/// Human-readable status block
pub fn print_status(path: &str, status: &SyncStatus) {
    println!("{}", "Workspace Status".bold());
    println!();
    println!("{}:     {}", "Path".dimmed(), path);
    println!("{}:   {}", "Branch".dimmed(), status.branch.cyan());
    println!(
        "{}:   {}",
        "Active".dimmed(),
        if status.active {
            "yes".green()
        } else {
            "no".yellow()
        }
    );
    println!(
        "{}:     {}",
        "Head".dimmed(),
        status
            .last_commit_hash
            .as_deref()
            .map(short)
            .unwrap_or("(no commits)")
    );
    println!(
        "{}: {}",
        "Synced at".dimmed(),
        status
            .last_sync_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    println!("{}:  {}", "Pending".dimmed(), status.pending_change_count);

    if status.conflict_detected {
        println!();
        println!(
            "{} Conflict detected; resolve it and run {}",
            "!".red().bold(),
            "wsync sync".cyan()
        );
    }
    if let Some(error) = &status.last_error {
        println!("{}:    {}", "Error".red(), error);
    }
}
