//! Watch command implementation

use std::io::{self, BufRead};
use std::time::Duration;

use colored::Colorize;
use wsync_core::{SyncPolicy, WorkspaceRegistry};

use super::{commit, status, sync};
use crate::cli::WorkspaceArgs;
use crate::context;
use crate::error::{CliError, Result};

/// Options that only apply to a long-running watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub interval: u64,
    pub debounce_ms: u64,
    pub auto_commit: bool,
    pub auto_pull: bool,
    pub collaboration: bool,
}

impl WatchOptions {
    /// With a policy file only the switches that disable automation, or
    /// enable collaboration mode, are applied on top of it.
    fn apply(&self, policy: SyncPolicy, from_file: bool) -> SyncPolicy {
        let mut policy = if from_file {
            policy
        } else {
            policy
                .with_pull_interval_seconds(self.interval)
                .with_debounce(Duration::from_millis(self.debounce_ms))
        };
        if !self.auto_commit {
            policy = policy.with_auto_commit(false);
        }
        if !self.auto_pull {
            policy = policy.with_auto_pull(false);
        }
        if self.collaboration {
            policy = policy.with_collaboration_mode(true);
        }
        policy
    }
}

/// Run the watch command until stdin is closed or `quit` is entered
pub fn run_watch(args: &WorkspaceArgs, options: WatchOptions) -> Result<()> {
    let policy = options.apply(context::resolve_policy(args)?, args.policy.is_some());
    let summary = describe(&policy);
    let registry = context::open(args, policy)?;

    println!(
        "{} Watching {} ({})",
        "=>".blue().bold(),
        args.path.display().to_string().cyan(),
        summary
    );
    println!(
        "   Commands: {}, {}, {}, {}, {}",
        "status".cyan(),
        "commit [message]".cyan(),
        "sync".cyan(),
        "reset".cyan(),
        "quit".cyan()
    );

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let (command, rest) = match line.trim().split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line.trim(), ""),
        };
        match command {
            "" => {}
            "quit" | "exit" => break,
            _ => {
                if let Err(e) = dispatch(&registry, args, command, rest) {
                    eprintln!("{}: {}", "error".red().bold(), e);
                }
            }
        }
    }

    registry.shutdown();
    println!("{} Stopped watching", "OK".green().bold());
    Ok(())
}

fn dispatch(registry: &WorkspaceRegistry, args: &WorkspaceArgs, command: &str, rest: &str) -> Result<()> {
    let handle = args.handle.as_str();
    match command {
        "status" => {
            status::print_status(&args.path.display().to_string(), &registry.status(handle)?);
        }
        "commit" => {
            let message = (!rest.is_empty()).then_some(rest);
            commit::print_outcome(&registry.commit_and_sync(handle, message)?);
        }
        "sync" => sync::print_outcome(&registry.sync_with_remote(handle)?),
        "reset" => {
            registry.reset_conflict(handle)?;
            println!("{} Conflict cleared", "OK".green().bold());
        }
        other => return Err(CliError::user(format!("unknown command: {other}"))),
    }
    Ok(())
}

fn describe(policy: &SyncPolicy) -> String {
    let on_off = |enabled: bool| if enabled { "on" } else { "off" };
    let mut parts = vec![
        format!("branch {}", policy.branch),
        format!("auto-commit {}", on_off(policy.auto_commit)),
        format!("auto-pull {}", on_off(policy.auto_pull)),
    ];
    if policy.auto_pull {
        parts.push(format!("every {}s", policy.pull_interval_seconds));
    }
    if policy.collaboration_mode {
        parts.push("collaboration".to_string());
    }
    parts.join(", ")
}
