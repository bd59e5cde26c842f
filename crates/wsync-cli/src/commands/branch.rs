//! Branch command implementations

use colored::Colorize;

use crate::cli::WorkspaceArgs;
use crate::context;
use crate::error::Result;

/// Create a branch at HEAD
pub fn run_branch_create(args: &WorkspaceArgs, name: &str) -> Result<()> {
    let registry = context::open(args, context::one_shot_policy(args)?)?;
    let result = registry.create_branch(&args.handle, name);
    registry.shutdown();
    result?;

    println!("{} Created branch {}", "OK".green().bold(), name.cyan());
    Ok(())
}

/// Switch the working tree to another branch
pub fn run_branch_switch(args: &WorkspaceArgs, name: &str) -> Result<()> {
    let registry = context::open(args, context::one_shot_policy(args)?)?;
    let result = registry.switch_branch(&args.handle, name);
    registry.shutdown();
    result?;

    println!("{} Switched to branch {}", "OK".green().bold(), name.cyan());
    Ok(())
}

/// List local and remote-tracking branches
pub fn run_branch_list(args: &WorkspaceArgs, json: bool) -> Result<()> {
    let registry = context::open(args, context::one_shot_policy(args)?)?;
    let listing = registry.list_branches(&args.handle);
    registry.shutdown();
    let listing = listing?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("{}:", "Local".bold());
    for branch in &listing.local {
        if listing.current.as_deref() == Some(branch.as_str()) {
            println!("  {} {}", "*".green(), branch.green().bold());
        } else {
            println!("    {}", branch);
        }
    }
    if !listing.remote.is_empty() {
        println!();
        println!("{}:", "Remote".bold());
        for branch in &listing.remote {
            println!("    {}", branch.dimmed());
        }
    }
    Ok(())
}
