//! Workspace sync CLI
//!
//! Keeps a working directory synchronized with a remote git repository.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{BranchAction, Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute_command(cli.command)
}

/// Logs go to stderr so `--json` output stays clean.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
    tracing::debug!("Verbose mode enabled");
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Watch {
            workspace,
            interval,
            debounce_ms,
            no_auto_commit,
            no_auto_pull,
            collaboration,
        } => commands::run_watch(
            &workspace,
            commands::WatchOptions {
                interval,
                debounce_ms,
                auto_commit: !no_auto_commit,
                auto_pull: !no_auto_pull,
                collaboration,
            },
        ),
        Commands::Commit {
            workspace,
            message,
            pull,
        } => commands::run_commit(&workspace, message.as_deref(), pull),
        Commands::Sync { workspace } => commands::run_sync(&workspace),
        Commands::Branch { action } => match action {
            BranchAction::Create { name, workspace } => {
                commands::run_branch_create(&workspace, &name)
            }
            BranchAction::Switch { name, workspace } => {
                commands::run_branch_switch(&workspace, &name)
            }
            BranchAction::List { workspace, json } => commands::run_branch_list(&workspace, json),
        },
        Commands::Status { workspace, json } => commands::run_status(&workspace, json),
    }
}
