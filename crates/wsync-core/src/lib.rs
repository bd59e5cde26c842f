//! Core orchestration layer for workspace synchronization
//!
//! Wires the Layer 0 crates into one running synchronizer per workspace:
//!
//! - **SyncPolicy**: immutable per-workspace configuration, built in code or
//!   loaded from a policy file
//! - **SyncController**: lifecycle state machine that turns settled change
//!   batches and timer ticks into serialized git operations
//! - **WorkspaceRegistry**: handle-keyed directory of live controllers, owned
//!   by the process root and injected into callers
//!
//! # Architecture
//!
//! ```text
//!                 CLI / embedding application
//!                            |
//!                        wsync-core
//!                            |
//!            +---------------+---------------+
//!            |               |               |
//!        wsync-fs        wsync-git      wsync-watch
//! ```
//!
//! # Example
//!
//! ```no_run
//! use wsync_core::{SyncPolicy, WorkspaceHandle, WorkspaceRegistry};
//!
//! fn example() -> wsync_core::Result<()> {
//!     let registry = WorkspaceRegistry::new();
//!     let policy = SyncPolicy::new("/work/site", "https://example.com/site.git", "main");
//!     registry.initialize(WorkspaceHandle::new("site"), policy)?;
//!     println!("{:?}", registry.status("site")?);
//!     registry.stop("site");
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod error;
pub mod factory;
pub mod handle;
pub mod policy;
pub mod registry;
pub mod status;

mod locking;

pub use controller::{CommitOutcome, DEFAULT_COMMIT_TEMPLATE, SyncController, SyncOutcome};
pub use error::{Error, Result};
pub use factory::{CliOperatorFactory, OperatorFactory};
pub use handle::WorkspaceHandle;
pub use policy::{PolicyFile, SyncPolicy};
pub use registry::WorkspaceRegistry;
pub use status::{LifecycleState, SyncStatus};
pub use wsync_git::ErrorKind;
