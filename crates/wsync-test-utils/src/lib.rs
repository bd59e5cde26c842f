//! Shared test utilities for the workspace-sync workspace.
//!
//! Dev-dependency only, never published.
//!
//! - [`git`]: real git fixtures driven through the `git` CLI
//! - [`remote`]: [`RemoteFixture`], a bare remote plus any number of clones

pub mod git;
pub mod remote;

pub use remote::RemoteFixture;
