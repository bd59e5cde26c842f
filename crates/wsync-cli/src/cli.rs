//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Workspace sync - keep a working copy continuously synchronized with its remote
#[derive(Parser, Debug)]
#[command(name = "wsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// How to locate and configure the workspace
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceArgs {
    /// Workspace directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Policy file (.toml, .json, .yaml); overrides the other workspace options
    #[arg(long, conflicts_with_all = ["remote", "branch"])]
    pub policy: Option<PathBuf>,

    /// Remote URL; defaults to the workspace's configured `origin`
    #[arg(long, env = "WSYNC_REMOTE")]
    pub remote: Option<String>,

    /// Branch to track; defaults to the checked-out branch, then `main`
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Environment variable holding the access token
    #[arg(long, default_value = "WSYNC_TOKEN")]
    pub credential_env: String,

    /// Workspace handle
    #[arg(long, default_value = "default")]
    pub handle: String,

    /// Commit author name (requires --author-email)
    #[arg(long, requires = "author_email")]
    pub author_name: Option<String>,

    /// Commit author email (requires --author-name)
    #[arg(long, requires = "author_name")]
    pub author_email: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch a workspace and synchronize it until stdin closes
    ///
    /// While running, these lines are accepted on stdin:
    ///   status            print the current status
    ///   commit [message]  commit and push now
    ///   sync              pull now
    ///   reset             clear a latched conflict
    ///   quit              stop watching
    ///
    /// Examples:
    ///   wsync watch ~/site --remote https://example.com/site.git
    ///   wsync watch --policy wsync.toml
    Watch {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        /// Seconds between periodic pulls
        #[arg(long, default_value_t = 30)]
        interval: u64,

        /// Quiet period in milliseconds before changes are committed
        #[arg(long, default_value_t = 1000)]
        debounce_ms: u64,

        /// Do not commit changes automatically
        #[arg(long)]
        no_auto_commit: bool,

        /// Do not pull automatically
        #[arg(long)]
        no_auto_pull: bool,

        /// Report any divergence as a conflict instead of merging
        #[arg(long)]
        collaboration: bool,
    },

    /// Commit all changes and push
    Commit {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        /// Commit message; generated from the staged changes when omitted
        #[arg(short, long)]
        message: Option<String>,

        /// Merge the remote branch before committing
        #[arg(long)]
        pull: bool,
    },

    /// Fetch and merge remote changes
    Sync {
        #[command(flatten)]
        workspace: WorkspaceArgs,
    },

    /// Branch operations
    Branch {
        #[command(subcommand)]
        action: BranchAction,
    },

    /// Show workspace status
    Status {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

/// Branch subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BranchAction {
    /// Create a branch at HEAD
    Create {
        /// Name of the new branch
        name: String,

        #[command(flatten)]
        workspace: WorkspaceArgs,
    },

    /// Switch to a branch
    Switch {
        /// Branch to check out
        name: String,

        #[command(flatten)]
        workspace: WorkspaceArgs,
    },

    /// List local and remote branches
    List {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
