//! Git operator facade for the workspace synchronization engine
//!
//! Exposes one narrow, synchronous operation per logical git action through
//! the [`GitOperator`] trait. The production implementation,
//! [`CliGitOperator`], runs mutations and network traffic through the `git`
//! binary as typed [`GitCommand`]s and answers read-only questions with
//! `git2`.

pub mod cli;
pub mod command;
pub mod credential;
pub mod diagnostics;
pub mod error;
pub mod inspect;
pub mod operator;

pub use cli::{CliGitOperator, OperatorOptions};
pub use command::{GitCommand, GitOutput};
pub use credential::Credential;
pub use error::{Error, ErrorKind, Result};
pub use operator::{BranchListing, ChangeSummary, CommitIdentity, GitOperator};
