mod support;

use support::task;
use ytdl_tracker::common::models::{DownloadMode, Quality, Task, TaskStatus};
use ytdl_tracker::tracker::reconciler::{MergeOutcome, Reconciler};
use ytdl_tracker::tracker::registry::TaskRegistry;

fn ids(reconciler: &Reconciler) -> Vec<String> {
    reconciler.registry().ids().cloned().collect()
}

#[test]
fn test_registry_keeps_first_seen_order() {
    let mut registry = TaskRegistry::new();
    registry.upsert(task("a", TaskStatus::Starting, 0.0));
    registry.upsert(task("b", TaskStatus::Starting, 0.0));
    registry.upsert(task("a", TaskStatus::Downloading, 40.0));

    let order: Vec<_> = registry.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(order, vec!["a", "b"]);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get("a").unwrap().progress, 40.0);
}

#[test]
fn test_merge_is_idempotent() {
    let mut once = Reconciler::new();
    once.register_submitted(task("a", TaskStatus::Starting, 0.0));
    let update = task("a", TaskStatus::Downloading, 55.0);
    once.merge(update.clone());

    let mut twice = Reconciler::new();
    twice.register_submitted(task("a", TaskStatus::Starting, 0.0));
    assert_eq!(twice.merge(update.clone()), MergeOutcome::Updated);
    assert_eq!(twice.merge(update), MergeOutcome::Unchanged);

    assert_eq!(once.registry().to_vec(), twice.registry().to_vec());
    assert_eq!(once.active().snapshot(), twice.active().snapshot());
}

#[test]
fn test_terminal_merge_is_idempotent_too() {
    let mut reconciler = Reconciler::new();
    reconciler.register_submitted(task("a", TaskStatus::Starting, 0.0));
    let mut done = task("a", TaskStatus::Completed, 100.0);
    done.download_path = Some("/downloads/a".to_string());

    reconciler.merge(done.clone());
    let after_first = reconciler.registry().to_vec();
    reconciler.merge(done);

    assert_eq!(reconciler.registry().to_vec(), after_first);
    assert!(reconciler.active().is_empty());
}

#[test]
fn test_retired_id_never_reenters_active_set() {
    let mut reconciler = Reconciler::new();
    reconciler.register_submitted(task("a", TaskStatus::Starting, 0.0));
    reconciler.merge(task("a", TaskStatus::Failed, 12.0));
    assert!(!reconciler.active().contains("a"));

    // 离开终态的更新被拒绝
    assert_eq!(
        reconciler.merge(task("a", TaskStatus::Downloading, 20.0)),
        MergeOutcome::TerminalLocked
    );
    assert!(!reconciler.activate("a"));
    assert!(!reconciler.register_submitted(task("a", TaskStatus::Starting, 0.0)));

    // 快照也不能把它带回来
    reconciler.load_all(vec![task("a", TaskStatus::Downloading, 30.0)]);
    assert!(!reconciler.active().contains("a"));
    assert_eq!(
        reconciler.registry().get("a").unwrap().status,
        TaskStatus::Failed
    );
}

#[test]
fn test_older_tick_does_not_overwrite_newer() {
    let mut reconciler = Reconciler::new();
    reconciler.register_submitted(task("a", TaskStatus::Starting, 0.0));

    assert_eq!(
        reconciler.merge_polled(5, task("a", TaskStatus::Downloading, 60.0)),
        MergeOutcome::Updated
    );
    let before = reconciler.registry().to_vec();

    assert_eq!(
        reconciler.merge_polled(4, task("a", TaskStatus::Downloading, 30.0)),
        MergeOutcome::Stale
    );
    assert_eq!(reconciler.registry().to_vec(), before);
    assert_eq!(reconciler.last_applied_tick("a"), Some(5));

    // 同一批次或更新的批次照常应用
    assert_eq!(
        reconciler.merge_polled(6, task("a", TaskStatus::Downloading, 70.0)),
        MergeOutcome::Updated
    );
    assert_eq!(reconciler.registry().get("a").unwrap().progress, 70.0);
}

#[test]
fn test_stale_terminal_response_cannot_retire_after_newer_tick() {
    let mut reconciler = Reconciler::new();
    reconciler.register_submitted(task("a", TaskStatus::Starting, 0.0));
    reconciler.merge_polled(3, task("a", TaskStatus::Downloading, 10.0));
    // 不会发生：旧批次带回终态。即便如此也按批次号丢弃
    assert_eq!(
        reconciler.merge_polled(2, task("a", TaskStatus::Failed, 0.0)),
        MergeOutcome::Stale
    );
    assert!(reconciler.active().contains("a"));
}

#[test]
fn test_single_audio_lifecycle() {
    let mut reconciler = Reconciler::new();
    let submitted = Task::provisional(
        "job-1".to_string(),
        "https://youtu.be/abc",
        DownloadMode::SingleAudio,
        Quality::K192,
        None,
    );
    assert!(reconciler.register_submitted(submitted));

    let registered = reconciler.registry().get("job-1").unwrap();
    assert_eq!(registered.mode, DownloadMode::SingleAudio);
    assert_eq!(registered.quality, Quality::K192);
    assert_eq!(registered.status, TaskStatus::Starting);
    assert_eq!(reconciler.registry().len(), 1);

    let mut polled = registered.clone();
    for (tick, progress) in [(1, 10.0), (2, 45.0), (3, 90.0)] {
        polled.status = TaskStatus::Downloading;
        polled.progress = progress;
        reconciler.merge_polled(tick, polled.clone());
        assert!(reconciler.active().contains("job-1"), "tick {}", tick);
    }

    polled.status = TaskStatus::Completed;
    polled.progress = 100.0;
    polled.download_path = Some("/downloads/job-1".to_string());
    reconciler.merge_polled(4, polled.clone());

    assert!(reconciler.active().is_empty());
    assert_eq!(reconciler.registry().get("job-1"), Some(&polled));
}

#[test]
fn test_two_jobs_one_fails() {
    let mut reconciler = Reconciler::new();
    reconciler.register_submitted(task("a", TaskStatus::Starting, 0.0));
    reconciler.register_submitted(task("b", TaskStatus::Starting, 0.0));
    assert_eq!(reconciler.active().snapshot(), vec!["a", "b"]);

    let mut failed = task("b", TaskStatus::Failed, 0.0);
    failed.error = Some("Video unavailable".to_string());
    reconciler.merge_polled(1, failed);
    reconciler.merge_polled(1, task("a", TaskStatus::Downloading, 25.0));

    assert_eq!(reconciler.active().snapshot(), vec!["a"]);
    assert_eq!(ids(&reconciler), vec!["a", "b"]);
    assert_eq!(
        reconciler.registry().get("b").unwrap().error.as_deref(),
        Some("Video unavailable")
    );
}

#[test]
fn test_load_all_recomputes_active_set() {
    let mut reconciler = Reconciler::new();
    reconciler.register_submitted(task("gone", TaskStatus::Starting, 0.0));

    reconciler.load_all(vec![
        task("x", TaskStatus::Completed, 100.0),
        task("y", TaskStatus::Downloading, 20.0),
        task("z", TaskStatus::Starting, 0.0),
    ]);

    assert_eq!(ids(&reconciler), vec!["x", "y", "z"]);
    assert_eq!(reconciler.active().snapshot(), vec!["y", "z"]);
    // 活跃集合始终是任务表的子集
    for id in reconciler.active().snapshot() {
        assert!(reconciler.registry().contains(&id));
    }
}

#[test]
fn test_outdated_reload_is_discarded() {
    let mut reconciler = Reconciler::new();
    let first = reconciler.begin_reload();
    let second = reconciler.begin_reload();

    assert!(reconciler.finish_reload(second, vec![task("new", TaskStatus::Downloading, 50.0)]));
    assert!(!reconciler.finish_reload(first, vec![task("old", TaskStatus::Starting, 0.0)]));

    assert_eq!(ids(&reconciler), vec!["new"]);
}

#[test]
fn test_register_keeps_record_loaded_first() {
    let mut reconciler = Reconciler::new();
    reconciler.load_all(vec![task("a", TaskStatus::Downloading, 33.0)]);

    reconciler.register_submitted(task("a", TaskStatus::Starting, 0.0));
    assert_eq!(reconciler.registry().get("a").unwrap().progress, 33.0);
    assert!(reconciler.active().contains("a"));
}

#[test]
fn test_late_poll_for_removed_task_is_dropped() {
    let mut reconciler = Reconciler::new();
    reconciler.register_submitted(task("a", TaskStatus::Starting, 0.0));

    // 请求发出之后，刷新发现服务端已经没有这个任务
    reconciler.load_all(vec![]);
    assert_eq!(
        reconciler.merge_polled(3, task("a", TaskStatus::Downloading, 40.0)),
        MergeOutcome::Stale
    );

    assert!(reconciler.registry().is_empty());
    assert!(reconciler.active().is_empty());
}

#[test]
fn test_cleared_task_releases_retirement() {
    let mut reconciler = Reconciler::new();
    reconciler.register_submitted(task("a", TaskStatus::Starting, 0.0));
    reconciler.register_submitted(task("b", TaskStatus::Starting, 0.0));
    reconciler.merge(task("a", TaskStatus::Completed, 100.0));
    reconciler.merge(task("b", TaskStatus::Failed, 5.0));
    assert!(reconciler.active().is_retired("a"));

    // 服务端清理了 a，b 仍在
    reconciler.load_all(vec![task("b", TaskStatus::Failed, 5.0)]);

    assert!(!reconciler.active().is_retired("a"));
    assert!(reconciler.active().is_retired("b"));
    assert!(reconciler.active().is_empty());
}
