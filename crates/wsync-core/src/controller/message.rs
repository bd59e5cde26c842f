//! Commit message rendering

use chrono::{DateTime, SecondsFormat, Utc};
use wsync_git::ChangeSummary;

/// Template used when neither the caller nor the policy supplies a message.
///
/// Placeholders: `{summary}`, `{added}`, `{modified}`, `{deleted}`,
/// `{renamed}`, `{branch}`, `{timestamp}` (RFC 3339, UTC). Anything else in
/// braces is kept verbatim.
pub const DEFAULT_COMMIT_TEMPLATE: &str = "Auto-commit: {summary} at {timestamp}";

pub(crate) fn render(
    template: Option<&str>,
    summary: &ChangeSummary,
    branch: &str,
    now: DateTime<Utc>,
) -> String {
    template
        .unwrap_or(DEFAULT_COMMIT_TEMPLATE)
        .replace("{summary}", &summary.to_string())
        .replace("{added}", &summary.added.to_string())
        .replace("{modified}", &summary.modified.to_string())
        .replace("{deleted}", &summary.deleted.to_string())
        .replace("{renamed}", &summary.renamed.to_string())
        .replace("{branch}", branch)
        .replace("{timestamp}", &now.to_rfc3339_opts(SecondsFormat::Secs, true))
}
