//! Recognition of divergent-history signatures in git output.
//!
//! Git is run with `LC_ALL=C`, so these English markers are stable.

const PULL_CONFLICT_MARKERS: &[&str] = &[
    "CONFLICT (",
    "Automatic merge failed",
    "fix conflicts and then commit",
    "unmerged files",
    "you have unmerged paths",
    "Not possible to fast-forward",
    "divergent branches",
];

const PUSH_REJECTION_MARKERS: &[&str] = &[
    "[rejected]",
    "non-fast-forward",
    "fetch first",
    "Updates were rejected",
];

/// Whether pull output describes a merge that git could not complete on its own.
pub fn is_pull_conflict(output: &str) -> bool {
    contains_any(output, PULL_CONFLICT_MARKERS)
}

/// Whether push output describes a rejection because the remote moved ahead.
pub fn is_push_rejection(output: &str) -> bool {
    contains_any(output, PUSH_REJECTION_MARKERS)
}

fn contains_any(output: &str, markers: &[&str]) -> bool {
    let lowered = output.to_lowercase();
    markers
        .iter()
        .any(|marker| lowered.contains(&marker.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CONFLICT (content): Merge conflict in a.txt\nAutomatic merge failed; fix conflicts and then commit the result.")]
    #[case("error: Pulling is not possible because you have unmerged files.")]
    #[case("fatal: Not possible to fast-forward, aborting.")]
    #[case("hint: You have divergent branches and need to specify how to reconcile them.")]
    fn pull_conflicts(#[case] output: &str) {
        assert!(is_pull_conflict(output));
    }

    #[rstest]
    #[case(" ! [rejected]        main -> main (fetch first)")]
    #[case(" ! [rejected]        main -> main (non-fast-forward)")]
    #[case("hint: Updates were rejected because the tip of your current branch is behind")]
    fn push_rejections(#[case] output: &str) {
        assert!(is_push_rejection(output));
    }

    #[test]
    fn network_failures_are_not_conflicts() {
        let output = "fatal: unable to access 'https://example.com/x.git/': Could not resolve host";
        assert!(!is_pull_conflict(output));
        assert!(!is_push_rejection(output));
    }
}
