//! Controller behaviour against a recording git double

mod support;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wsync_core::{CommitOutcome, ErrorKind, LifecycleState, SyncOutcome};
use wsync_test_utils::git::write_file;

use support::{FakeConfig, FakeGit, manual_policy, wait_for};

const COMMIT_OPS: [&str; 5] = ["stage_all", "has_staged_changes", "staged_summary", "commit", "push"];
const SYNC_OPS: [&str; 4] = ["fetch", "head_commit", "remote_commit", "pull"];

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn test_initialize_captures_head_and_activates() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        head: Some("abc123".into()),
        ..Default::default()
    });
    let registry = fake.registry();

    let controller = registry.initialize("w1", manual_policy(temp.path())).unwrap();

    let status = controller.status();
    assert!(status.active);
    assert_eq!(status.branch, "main");
    assert_eq!(status.last_commit_hash.as_deref(), Some("abc123"));
    assert_eq!(status.pending_change_count, 0);
    assert_eq!(controller.state(), LifecycleState::Active);
    assert!(!controller.is_watching(), "both toggles off");
    assert!(!controller.has_timer());
}

#[test]
fn test_initialize_missing_path_is_invalid_workspace() {
    let temp = TempDir::new().unwrap();
    let registry = FakeGit::default().registry();

    let err = registry
        .initialize("w1", manual_policy(&temp.path().join("missing")))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidWorkspace);
    assert!(!registry.contains("w1"));
}

#[test]
fn test_initialize_rejects_invalid_policy() {
    let temp = TempDir::new().unwrap();
    let registry = FakeGit::default().registry();

    let err = registry
        .initialize("w1", manual_policy(temp.path()).with_pull_interval_seconds(0))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidWorkspace);
}

#[test]
fn test_initialize_auth_failure() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        auth_fails: true,
        ..Default::default()
    });

    let err = fake
        .registry()
        .initialize("w1", manual_policy(temp.path()))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthConfigurationFailed);
}

#[test]
fn test_failed_initialize_releases_workspace_lock() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        auth_fails: true,
        ..Default::default()
    });
    let registry = fake.registry();
    registry
        .initialize("w1", manual_policy(temp.path()))
        .unwrap_err();

    fake.configure(|c| c.auth_fails = false);
    registry.initialize("w1", manual_policy(temp.path())).unwrap();
}

#[test]
fn test_second_synchronizer_on_same_tree_is_rejected() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::default();
    let first = fake.registry();
    let second = fake.registry();

    first.initialize("w1", manual_policy(temp.path())).unwrap();
    let err = second
        .initialize("other", manual_policy(temp.path()))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidWorkspace);
}

// ============================================================================
// P3: no-op commit
// ============================================================================

#[test]
fn test_commit_without_staged_changes_is_noop() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        head: Some("abc123".into()),
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize("w1", manual_policy(temp.path()))
        .unwrap();
    fake.clear_log();

    let outcome = controller.commit_and_sync(None).unwrap();

    assert_eq!(outcome, CommitOutcome::NothingToCommit);
    assert_eq!(fake.count("commit"), 0);
    assert_eq!(fake.count("push"), 0);
    assert_eq!(controller.status().last_commit_hash.as_deref(), Some("abc123"));
}

#[test]
fn test_commit_without_staged_changes_pushes_existing_commits() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        head: Some("merge".into()),
        unpushed: 2,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize("w1", manual_policy(temp.path()))
        .unwrap();

    let outcome = controller.commit_and_sync(None).unwrap();

    assert_eq!(outcome, CommitOutcome::PushedExisting { commits: 2 });
    assert_eq!(fake.count("commit"), 0);
    assert_eq!(fake.count("push"), 1);
    assert!(controller.status().last_sync_time.is_some());
}

#[test]
fn test_commit_and_push_updates_status() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize("w1", manual_policy(temp.path()))
        .unwrap();

    let outcome = controller.commit_and_sync(Some("Manual save")).unwrap();

    let CommitOutcome::Committed { hash, summary } = outcome else {
        panic!("expected a commit, got {outcome:?}");
    };
    assert_eq!(summary.added, 1);
    let status = controller.status();
    assert_eq!(status.last_commit_hash, Some(hash));
    assert!(status.last_sync_time.is_some());
    assert!(!status.conflict_detected);
}

#[test]
fn test_pre_commit_pull_only_with_auto_pull() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        remote: Some("r1".into()),
        ..Default::default()
    });
    let registry = fake.registry();

    registry.initialize("w1", manual_policy(temp.path())).unwrap();
    fake.clear_log();
    registry.commit_and_sync("w1", None).unwrap();
    assert_eq!(fake.count("pull"), 0, "commit-only workspaces never pull");

    registry
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_pull(true)
                .with_pull_interval_seconds(3600),
        )
        .unwrap();
    fake.configure(|c| c.staged = true);
    fake.clear_log();
    registry.commit_and_sync("w1", None).unwrap();

    let log = fake.log();
    assert_eq!(&log[..4], &["fetch", "remote_commit", "pull", "stage_all"]);
}

// ============================================================================
// P2: threshold trigger
// ============================================================================

#[test]
fn test_threshold_triggers_exactly_one_commit_attempt() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_commit(true)
                .with_pull_interval_seconds(3600),
        )
        .unwrap();
    assert!(controller.is_watching());
    fake.clear_log();

    for i in 0..6 {
        write_file(temp.path(), &format!("file{i}.txt"), "content");
    }

    assert!(
        wait_for(Duration::from_secs(10), || fake.count("stage_all") == 1),
        "threshold commit never happened: {:?}",
        fake.log()
    );
    thread::sleep(Duration::from_millis(500));
    assert_eq!(fake.count("stage_all"), 1);
    assert_eq!(fake.count("commit"), 1);
    assert!(wait_for(Duration::from_secs(2), || controller.status().pending_change_count == 0));
}

#[test]
fn test_below_threshold_waits_for_tick() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::default();
    let controller = fake
        .registry()
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_commit(true)
                .with_pull_interval_seconds(3600),
        )
        .unwrap();
    fake.clear_log();

    write_file(temp.path(), "a.txt", "a");
    write_file(temp.path(), "b.txt", "b");

    assert!(wait_for(Duration::from_secs(5), || {
        controller.status().pending_change_count == 2
    }));
    thread::sleep(Duration::from_millis(400));
    assert_eq!(fake.count("stage_all"), 0);
}

#[test]
fn test_timer_flushes_small_settled_batch() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_commit(true)
                .with_pull_interval_seconds(1),
        )
        .unwrap();

    write_file(temp.path(), "notes.md", "draft");

    assert!(
        wait_for(Duration::from_secs(5), || fake.count("commit") == 1),
        "tick never flushed: {:?}",
        fake.log()
    );
    assert!(wait_for(Duration::from_secs(2), || controller.status().pending_change_count == 0));
    assert_eq!(fake.count("fetch"), 0, "commit-only workspaces never fetch");
}

#[test]
fn test_huge_pull_interval_still_commits_on_threshold() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_commit(true)
                .with_pull_interval_seconds(u64::MAX),
        )
        .unwrap();
    assert!(controller.has_timer());

    for i in 0..6 {
        write_file(temp.path(), &format!("file{i}.txt"), "content");
    }

    assert!(
        wait_for(Duration::from_secs(10), || fake.count("commit") == 1),
        "sync worker never committed: {:?}",
        fake.log()
    );
    assert!(controller.has_timer());
}

// ============================================================================
// Batch accounting
// ============================================================================

#[test]
fn test_changes_during_commit_stay_pending() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_commit(true)
                .with_pull_interval_seconds(3600),
        )
        .unwrap();
    fake.configure(|c| c.op_delay = Duration::from_millis(800));

    for i in 0..5 {
        write_file(temp.path(), &format!("file{i}.txt"), "content");
    }
    assert!(
        wait_for(Duration::from_secs(10), || fake.count("stage_all") == 1),
        "threshold commit never started: {:?}",
        fake.log()
    );

    // Lands while the commit holds the git lock
    write_file(temp.path(), "late.txt", "late");

    assert!(
        wait_for(Duration::from_secs(15), || controller.status().last_sync_time.is_some()),
        "commit never finished: {:?}",
        fake.log()
    );
    assert!(wait_for(Duration::from_secs(5), || {
        controller.status().pending_change_count == 1
    }));
    assert_eq!(fake.count("commit"), 1);
}

#[test]
fn test_failed_commit_keeps_changes_pending() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_commit(true)
                .with_pull_interval_seconds(3600),
        )
        .unwrap();

    write_file(temp.path(), "draft.md", "draft");
    assert!(wait_for(Duration::from_secs(5), || {
        controller.status().pending_change_count == 1
    }));

    fake.configure(|c| c.commit_fails = true);
    let err = controller.commit_and_sync(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GitFailure);

    let status = controller.status();
    assert_eq!(status.pending_change_count, 1);
    assert!(status.last_error.is_some());
    assert!(!status.conflict_detected);

    fake.configure(|c| c.commit_fails = false);
    let outcome = controller.commit_and_sync(None).unwrap();
    assert!(matches!(outcome, CommitOutcome::Committed { .. }));
    assert_eq!(controller.status().pending_change_count, 0);
}

// ============================================================================
// P4: serialization
// ============================================================================

#[test]
fn test_concurrent_commit_and_sync_never_interleave() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        head: Some("local".into()),
        remote: Some("remote".into()),
        op_delay: Duration::from_millis(20),
        ..Default::default()
    });
    let registry = Arc::new(fake.registry());
    registry.initialize("w1", manual_policy(temp.path())).unwrap();
    fake.clear_log();

    let barrier = Arc::new(Barrier::new(2));
    let (r1, b1) = (Arc::clone(&registry), Arc::clone(&barrier));
    let (r2, b2) = (Arc::clone(&registry), Arc::clone(&barrier));

    let committer = thread::spawn(move || {
        b1.wait();
        r1.commit_and_sync("w1", None)
    });
    let syncer = thread::spawn(move || {
        b2.wait();
        r2.sync_with_remote("w1")
    });
    committer.join().unwrap().unwrap();
    syncer.join().unwrap().unwrap();

    assert_eq!(fake.max_in_flight(), 1);

    let log = fake.log();
    let positions = |ops: &[&str]| -> Vec<usize> {
        log.iter()
            .enumerate()
            .filter(|(_, op)| ops.contains(op))
            .map(|(i, _)| i)
            .collect()
    };
    let commit = positions(&COMMIT_OPS);
    let sync = positions(&SYNC_OPS);
    assert!(!commit.is_empty() && !sync.is_empty());
    let commit_first = commit.iter().max() < sync.iter().min();
    let sync_first = sync.iter().max() < commit.iter().min();
    assert!(commit_first || sync_first, "interleaved: {log:?}");
}

#[test]
fn test_background_ticks_serialize_with_manual_commits() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        op_delay: Duration::from_millis(40),
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_pull(true)
                .with_pull_interval_seconds(1),
        )
        .unwrap();

    for _ in 0..6 {
        fake.configure(|c| c.staged = true);
        controller.commit_and_sync(None).unwrap();
        thread::sleep(Duration::from_millis(150));
    }

    assert!(fake.count("fetch") > 6, "periodic ticks ran: {:?}", fake.log());
    assert_eq!(fake.max_in_flight(), 1);
}

// ============================================================================
// P5: conflict latch
// ============================================================================

#[test]
fn test_push_rejection_latches_conflict_across_ticks() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        remote: Some("r1".into()),
        head: Some("r1".into()),
        push_conflict: true,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_pull(true)
                .with_pull_interval_seconds(1),
        )
        .unwrap();

    let err = controller.commit_and_sync(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MergeConflict);
    let status = controller.status();
    assert!(status.conflict_detected);
    assert!(status.last_error.unwrap().contains("push"));

    fake.clear_log();
    assert!(wait_for(Duration::from_secs(5), || fake.count("fetch") >= 2));
    assert_eq!(fake.count("pull"), 0, "latched ticks only fetch");
    assert!(controller.status().conflict_detected);

    fake.configure(|c| {
        c.push_conflict = false;
        c.remote = Some("r2".into());
    });
    let outcome = controller.sync_with_remote().unwrap();
    assert_eq!(outcome, SyncOutcome::Pulled { head: Some("r2".into()) });
    let status = controller.status();
    assert!(!status.conflict_detected);
    assert_eq!(status.last_error, None);
}

#[test]
fn test_pull_conflict_on_tick_stops_further_pulls() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        head: Some("local".into()),
        remote: Some("remote".into()),
        pull_conflict: true,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_pull(true)
                .with_pull_interval_seconds(1),
        )
        .unwrap();

    assert!(wait_for(Duration::from_secs(5), || controller.status().conflict_detected));
    assert!(wait_for(Duration::from_secs(5), || fake.count("fetch") >= 3));
    assert_eq!(fake.count("pull"), 1);
    assert_eq!(controller.state(), LifecycleState::Active);
}

#[test]
fn test_branch_switch_clears_conflict_and_retargets() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        push_conflict: true,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize("w1", manual_policy(temp.path()))
        .unwrap();
    controller.commit_and_sync(None).unwrap_err();
    assert!(controller.status().conflict_detected);

    controller.switch_branch("feature").unwrap();

    let status = controller.status();
    assert!(!status.conflict_detected);
    assert_eq!(status.branch, "feature");
    assert_eq!(controller.branch(), "feature");
}

#[test]
fn test_failed_switch_keeps_conflict() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        push_conflict: true,
        ..Default::default()
    });
    let controller = fake
        .registry()
        .initialize("w1", manual_policy(temp.path()))
        .unwrap();
    controller.commit_and_sync(None).unwrap_err();

    let err = controller.switch_branch("missing").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::GitFailure);
    assert!(controller.status().conflict_detected);
    assert_eq!(controller.branch(), "main");
}

#[test]
fn test_reset_conflict_clears_flag() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        push_conflict: true,
        ..Default::default()
    });
    let registry = fake.registry();
    registry.initialize("w1", manual_policy(temp.path())).unwrap();
    registry.commit_and_sync("w1", None).unwrap_err();

    registry.reset_conflict("w1").unwrap();

    let status = registry.status("w1").unwrap();
    assert!(!status.conflict_detected);
    assert_eq!(status.last_error, None);
}

// ============================================================================
// P6: idempotent stop
// ============================================================================

#[test]
fn test_stop_twice_and_unknown_handle() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::default();
    let registry = fake.registry();
    let controller = registry
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_commit(true)
                .with_auto_pull(true)
                .with_pull_interval_seconds(1),
        )
        .unwrap();
    assert!(controller.is_watching());
    assert!(controller.has_timer());

    registry.stop("w1");
    registry.stop("w1");
    registry.stop("never-initialized");
    controller.stop();

    assert_eq!(controller.state(), LifecycleState::Stopped);
    assert!(!controller.status().active);
    assert!(!controller.is_watching());
    assert!(!controller.has_timer());
    assert_eq!(registry.get("w1").unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(registry.state("w1"), LifecycleState::Uninitialized);
}

#[test]
fn test_no_background_activity_after_stop() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::new(FakeConfig {
        staged: true,
        ..Default::default()
    });
    let registry = fake.registry();
    let controller = registry
        .initialize(
            "w1",
            manual_policy(temp.path())
                .with_auto_commit(true)
                .with_auto_pull(true)
                .with_pull_interval_seconds(1),
        )
        .unwrap();

    registry.stop("w1");
    controller.join();
    fake.clear_log();

    for i in 0..6 {
        write_file(temp.path(), &format!("late{i}.txt"), "x");
    }
    thread::sleep(Duration::from_millis(1500));

    assert_eq!(fake.log(), Vec::<&str>::new());
}

#[test]
fn test_commands_on_stopped_controller_are_not_found() {
    let temp = TempDir::new().unwrap();
    let registry = FakeGit::default().registry();
    let controller = registry.initialize("w1", manual_policy(temp.path())).unwrap();

    registry.stop("w1");

    assert_eq!(
        controller.commit_and_sync(None).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        registry.sync_with_remote("w1").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_stop_releases_workspace_lock() {
    let temp = TempDir::new().unwrap();
    let fake = FakeGit::default();
    let first = fake.registry();
    let second = fake.registry();

    first.initialize("w1", manual_policy(temp.path())).unwrap();
    first.stop("w1");

    second.initialize("w1", manual_policy(temp.path())).unwrap();
}
