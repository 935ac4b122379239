mod common;

use chrono::Duration;
use common::{FakeSource, SyncHarness, base_time, default_settings, meeting, wait_until};
use lifeos_sync_lib::test_support::application::{SkipReason, SyncService, TriggerOutcome};
use lifeos_sync_lib::test_support::domain::{IntegrationKind, SyncSettings, SyncStatusUpdate};
use std::sync::Arc;
use std::time::Duration as StdDuration;

fn manual_only() -> SyncSettings {
    SyncSettings {
        auto_sync_enabled: false,
        ..default_settings()
    }
}

#[tokio::test]
async fn overlapping_manual_trigger_is_rejected() {
    let (source, gate) = FakeSource::gated(vec![meeting("m-1", "Standup", base_time())]);
    let harness = SyncHarness::with_defaults(source, manual_only()).await;
    let scheduler = harness.scheduler();

    let first = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.trigger_manual().await })
    };

    // 最初の実行がfetchに入るまで待つ
    while harness.source.fetch_calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(scheduler.is_running());

    let second = scheduler.trigger_manual().await;
    assert_eq!(second, TriggerOutcome::Skipped(SkipReason::AlreadyRunning));
    assert_eq!(harness.pipeline.metrics().snapshot().skipped, 1);

    gate.notify_one();
    let outcome = first.await.expect("join");
    assert!(matches!(outcome, TriggerOutcome::Completed(summary) if summary.inserted_count == 1));
    assert!(!scheduler.is_running());
    assert_eq!(harness.source.fetch_calls(), 1);
}

#[tokio::test]
async fn countdown_counts_from_last_sync() {
    let harness = SyncHarness::with_defaults(FakeSource::new(Vec::new()), manual_only()).await;
    harness
        .settings
        .set_interval_minutes(IntegrationKind::Granola, 3)
        .await
        .expect("interval");
    harness
        .settings
        .record_last_sync_at(IntegrationKind::Granola, base_time() - Duration::seconds(60))
        .await
        .expect("last sync");

    let scheduler = harness.scheduler();
    assert_eq!(scheduler.seconds_until_next_run(), 0);

    let settings = scheduler.resume().await;
    assert!(!settings.auto_sync_enabled);
    assert!(!scheduler.is_started());
    assert_eq!(scheduler.interval_minutes(), 3);
    assert_eq!(scheduler.seconds_until_next_run(), 120);
    assert_eq!(*scheduler.subscribe_countdown().borrow(), 120);

    harness.advance(Duration::seconds(200));
    assert_eq!(scheduler.seconds_until_next_run(), 0);
}

#[tokio::test]
async fn remote_status_newer_than_local_setting_wins() {
    let harness = SyncHarness::with_defaults(FakeSource::new(Vec::new()), manual_only()).await;
    harness
        .settings
        .record_last_sync_at(IntegrationKind::Granola, base_time() - Duration::minutes(9))
        .await
        .expect("local");
    harness
        .store
        .update_status(
            IntegrationKind::Granola,
            SyncStatusUpdate::succeeded(base_time() - Duration::minutes(2), 4),
        )
        .await
        .expect("remote");

    let scheduler = harness.scheduler();
    scheduler.refresh_last_sync_at().await;
    assert_eq!(
        scheduler.last_sync_at(),
        Some(base_time() - Duration::minutes(2))
    );
    assert_eq!(scheduler.seconds_until_next_run(), 8 * 60);
}

#[tokio::test]
async fn tick_respects_interval_and_toggle() {
    let harness =
        SyncHarness::new(FakeSource::new(vec![meeting("m-1", "Retro", base_time())])).await;
    let scheduler = harness.scheduler();

    assert!(matches!(scheduler.tick().await, TriggerOutcome::Completed(_)));
    assert_eq!(
        scheduler.tick().await,
        TriggerOutcome::Skipped(SkipReason::NotDue)
    );

    harness.advance(Duration::minutes(10));
    assert!(matches!(scheduler.tick().await, TriggerOutcome::Completed(_)));
    assert_eq!(harness.source.fetch_calls(), 2);

    scheduler
        .set_auto_sync_enabled(false)
        .await
        .expect("disable");
    harness.advance(Duration::minutes(30));
    assert_eq!(
        scheduler.tick().await,
        TriggerOutcome::Skipped(SkipReason::Disabled)
    );
    assert!(!harness.settings.load(IntegrationKind::Granola).await.auto_sync_enabled);
}

#[tokio::test]
async fn interval_change_is_clamped_and_persisted() {
    let harness = SyncHarness::with_defaults(FakeSource::new(Vec::new()), manual_only()).await;
    let scheduler = harness.scheduler();

    let stored = scheduler.set_interval_minutes(0).await.expect("interval");
    assert_eq!(stored, 1);
    assert_eq!(scheduler.interval_minutes(), 1);
    assert_eq!(
        harness
            .settings
            .load(IntegrationKind::Granola)
            .await
            .interval_minutes,
        1
    );
    assert!(!scheduler.is_started());
}

#[tokio::test]
async fn startup_clears_stranded_syncing_flag() {
    let harness = SyncHarness::with_defaults(FakeSource::new(Vec::new()), manual_only()).await;
    harness
        .store
        .update_status(IntegrationKind::Granola, SyncStatusUpdate::started())
        .await
        .expect("stranded flag");

    let service = SyncService::new(
        harness.store.clone(),
        harness.settings.clone(),
        vec![harness.scheduler()],
    );
    service.initialize().await.expect("initialize");

    let status = service
        .status(IntegrationKind::Granola)
        .await
        .expect("status")
        .expect("status row");
    assert!(!status.is_syncing);

    let outcome = service
        .trigger_manual(IntegrationKind::Granola)
        .await
        .expect("trigger");
    assert!(matches!(outcome, TriggerOutcome::Completed(_)));

    let err = service
        .trigger_manual(IntegrationKind::Beeper)
        .await
        .expect_err("not registered");
    assert_eq!(err.code(), "NOT_FOUND");
    service.shutdown();
}

#[tokio::test]
async fn failing_source_is_retried_once_per_interval() {
    let harness = SyncHarness::new(FakeSource::new(Vec::new())).await;
    harness.source.fail_fetch_with(Some("connection refused"));
    let scheduler = harness.scheduler();
    scheduler.start(10);
    tokio::time::pause();

    for _ in 0..300 {
        harness.advance(Duration::seconds(1));
        tokio::time::sleep(StdDuration::from_secs(1)).await;
    }
    wait_until(|| !scheduler.is_running()).await;
    assert_eq!(harness.source.fetch_calls(), 1);
    assert_eq!(scheduler.last_sync_at(), None);
    assert!(scheduler.seconds_until_next_run() > 0);

    harness.advance(Duration::minutes(10));
    tokio::time::sleep(StdDuration::from_secs(61)).await;
    wait_until(|| harness.source.fetch_calls() == 2).await;
    wait_until(|| !scheduler.is_running()).await;
    scheduler.stop();
    tokio::time::resume();

    let status = harness
        .store
        .get_status(IntegrationKind::Granola)
        .await
        .expect("status")
        .expect("status row");
    assert!(!status.is_syncing);
    assert!(status.last_sync_error.is_some());
    assert_eq!(harness.pipeline.metrics().snapshot().failures, 2);
}

#[tokio::test]
async fn countdown_ticks_until_stopped() {
    let harness = SyncHarness::new(FakeSource::new(Vec::new())).await;
    harness
        .settings
        .set_interval_minutes(IntegrationKind::Granola, 3)
        .await
        .expect("interval");
    harness
        .settings
        .record_last_sync_at(IntegrationKind::Granola, base_time() - Duration::seconds(60))
        .await
        .expect("last sync");

    let scheduler = harness.scheduler();
    let mut countdown = scheduler.subscribe_countdown();
    scheduler.resume().await;
    assert!(scheduler.is_started());
    assert_eq!(*countdown.borrow_and_update(), 120);
    tokio::time::pause();

    harness.advance(Duration::seconds(30));
    countdown.changed().await.expect("countdown published");
    assert_eq!(*countdown.borrow_and_update(), 90);

    scheduler.stop();
    assert!(!scheduler.is_started());
    harness.advance(Duration::seconds(30));
    tokio::time::sleep(StdDuration::from_secs(5)).await;
    assert!(!countdown.has_changed().expect("sender alive"));
    assert_eq!(scheduler.seconds_until_next_run(), 60);
    assert_eq!(harness.source.fetch_calls(), 0);
}

#[tokio::test]
async fn reenabling_runs_an_overdue_sync_immediately() {
    let harness = SyncHarness::with_defaults(
        FakeSource::new(vec![meeting("m-1", "Planning", base_time())]),
        manual_only(),
    )
    .await;
    harness
        .settings
        .record_last_sync_at(IntegrationKind::Granola, base_time() - Duration::minutes(30))
        .await
        .expect("last sync");

    let scheduler = harness.scheduler();
    scheduler.resume().await;
    assert!(!scheduler.is_started());
    assert_eq!(scheduler.seconds_until_next_run(), 0);
    assert_eq!(harness.source.fetch_calls(), 0);

    scheduler
        .set_auto_sync_enabled(true)
        .await
        .expect("enable");
    wait_until(|| harness.source.fetch_calls() == 1).await;
    wait_until(|| !scheduler.is_running()).await;
    assert_eq!(scheduler.last_sync_at(), Some(base_time()));

    tokio::time::pause();
    tokio::time::sleep(StdDuration::from_secs(120)).await;
    assert_eq!(harness.source.fetch_calls(), 1);
    scheduler.stop();
}

#[tokio::test]
async fn disabling_leaves_in_flight_manual_run_alone() {
    let (source, gate) = FakeSource::gated(vec![meeting("m-1", "Standup", base_time())]);
    let harness = SyncHarness::new(source).await;
    let scheduler = harness.scheduler();

    let manual = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.trigger_manual().await })
    };
    wait_until(|| harness.source.fetch_calls() == 1).await;

    scheduler.start(10);
    tokio::task::yield_now().await;
    assert!(scheduler.is_started());

    scheduler
        .set_auto_sync_enabled(false)
        .await
        .expect("disable");
    assert!(!scheduler.is_started());
    assert!(scheduler.is_running());

    gate.notify_one();
    let outcome = manual.await.expect("join");
    assert!(matches!(outcome, TriggerOutcome::Completed(summary) if summary.inserted_count == 1));
    assert!(!scheduler.is_running());
    assert_eq!(harness.source.fetch_calls(), 1);
}

#[tokio::test]
async fn startup_reset_keeps_flag_of_run_in_flight() {
    let (source, gate) = FakeSource::gated(vec![meeting("m-1", "Standup", base_time())]);
    let harness = SyncHarness::with_defaults(source, manual_only()).await;
    let scheduler = harness.scheduler();
    let service = SyncService::new(
        harness.store.clone(),
        harness.settings.clone(),
        vec![Arc::clone(&scheduler)],
    );

    let manual = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.trigger_manual().await })
    };
    wait_until(|| harness.source.fetch_calls() == 1).await;

    service.initialize().await.expect("initialize");
    let status = service
        .status(IntegrationKind::Granola)
        .await
        .expect("status")
        .expect("status row");
    assert!(status.is_syncing);

    gate.notify_one();
    assert!(matches!(manual.await.expect("join"), TriggerOutcome::Completed(_)));
    let status = service
        .status(IntegrationKind::Granola)
        .await
        .expect("status")
        .expect("status row");
    assert!(!status.is_syncing);
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_run() {
    let (source, gate) = FakeSource::gated(vec![meeting("m-1", "Standup", base_time())]);
    let harness = SyncHarness::with_defaults(source, manual_only()).await;
    let scheduler = harness.scheduler();
    let service = SyncService::new(
        harness.store.clone(),
        harness.settings.clone(),
        vec![Arc::clone(&scheduler)],
    );

    let manual = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.trigger_manual().await })
    };
    wait_until(|| harness.source.fetch_calls() == 1).await;

    service.shutdown();
    assert!(!service.wait_for_idle(StdDuration::from_millis(300)).await);

    gate.notify_one();
    assert!(service.wait_for_idle(StdDuration::from_secs(5)).await);
    assert!(!service.is_any_running());
    manual.await.expect("join");

    let status = service
        .status(IntegrationKind::Granola)
        .await
        .expect("status")
        .expect("status row");
    assert!(!status.is_syncing);
}
