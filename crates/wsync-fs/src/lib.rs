//! Filesystem primitives for the workspace synchronization engine
//!
//! Provides normalized path handling, the fixed ignore policy applied to
//! watched workspaces, the per-workspace advisory lock, and format-agnostic
//! policy file loading.

pub mod config;
pub mod error;
pub mod ignore;
pub mod lock;
pub mod path;

pub use config::{ConfigStore, PolicyFormat};
pub use error::{Error, Result};
pub use ignore::{IgnoreRule, is_ignored};
pub use lock::WorkspaceLock;
pub use path::NormalizedPath;
