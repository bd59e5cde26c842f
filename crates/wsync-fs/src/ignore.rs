//! Fixed ignore policy for watched workspaces.
//!
//! The set is deliberately static: it is not configurable per workspace or
//! per call. Paths are matched on their workspace-relative form.

use crate::NormalizedPath;

/// A single ignore rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreRule {
    /// Any path with this segment anywhere, including the file name
    Segment(&'static str),
    /// Any path below a directory of this name; a file so named is kept
    Directory(&'static str),
    /// A file whose name equals this exactly
    FileName(&'static str),
    /// A file whose name ends with this suffix
    Suffix(&'static str),
}

/// The ignore set applied to every workspace.
pub const IGNORE_RULES: &[IgnoreRule] = &[
    // Version control; `.git` may also be a gitfile
    IgnoreRule::Segment(".git"),
    // Build output
    IgnoreRule::Directory("target"),
    IgnoreRule::Directory("build"),
    IgnoreRule::Directory("dist"),
    IgnoreRule::Directory("out"),
    IgnoreRule::Directory(".next"),
    IgnoreRule::Directory(".gradle"),
    // Dependencies
    IgnoreRule::Directory("node_modules"),
    IgnoreRule::Directory("vendor"),
    IgnoreRule::Directory(".venv"),
    IgnoreRule::Directory("venv"),
    // Caches and temp
    IgnoreRule::Directory("__pycache__"),
    IgnoreRule::Directory(".cache"),
    IgnoreRule::Directory(".pytest_cache"),
    IgnoreRule::Directory(".mypy_cache"),
    IgnoreRule::Directory("tmp"),
    IgnoreRule::Directory(".tmp"),
    // OS metadata
    IgnoreRule::FileName(".DS_Store"),
    IgnoreRule::FileName("Thumbs.db"),
    IgnoreRule::FileName("desktop.ini"),
    // Editor swap and temp files
    IgnoreRule::Suffix(".swp"),
    IgnoreRule::Suffix(".swx"),
    IgnoreRule::Suffix(".tmp"),
    IgnoreRule::Suffix("~"),
];

impl IgnoreRule {
    /// Check whether this rule matches a workspace-relative path.
    pub fn matches(&self, relative: &NormalizedPath) -> bool {
        match self {
            Self::Segment(name) => relative.segments().any(|segment| segment == *name),
            Self::Directory(name) => {
                let segments: Vec<&str> = relative.segments().collect();
                segments
                    .split_last()
                    .is_some_and(|(_, parents)| parents.contains(name))
            }
            Self::FileName(name) => relative.file_name() == Some(name),
            Self::Suffix(suffix) => relative
                .file_name()
                .is_some_and(|file| file.ends_with(suffix)),
        }
    }
}

/// Check a workspace-relative path against the fixed ignore set.
pub fn is_ignored(relative: &NormalizedPath) -> bool {
    IGNORE_RULES.iter().any(|rule| rule.matches(relative))
}
