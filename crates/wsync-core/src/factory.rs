//! Construction of git operators for new controllers

use wsync_fs::NormalizedPath;
use wsync_git::{CliGitOperator, GitOperator};

use crate::SyncPolicy;

/// Builds the [`GitOperator`] a controller drives.
///
/// The registry owns one factory and calls it once per `Initialize`, after the
/// workspace root has been canonicalized.
pub trait OperatorFactory: Send + Sync {
    fn create(&self, root: &NormalizedPath, policy: &SyncPolicy) -> Box<dyn GitOperator>;
}

/// Factory for operators backed by the `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliOperatorFactory;

impl OperatorFactory for CliOperatorFactory {
    fn create(&self, root: &NormalizedPath, policy: &SyncPolicy) -> Box<dyn GitOperator> {
        Box::new(CliGitOperator::new(root.clone(), policy.operator_options()))
    }
}
