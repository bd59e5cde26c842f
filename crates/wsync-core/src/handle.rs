//! Caller-chosen workspace identifiers

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier chosen by the caller when a workspace is initialized.
///
/// The engine never generates handles; it only uses them as registry keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceHandle(String);

impl WorkspaceHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for WorkspaceHandle {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkspaceHandle {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WorkspaceHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}
