//! Orchestrator tests: ordering, failure isolation, single pass and
//! automatic triggering

use crate::assert_queue_titles;
use crate::common::*;
use assert_matches::assert_matches;
use geoinfo::citizen_app::offline::{QueueStore, RetryPolicy};
use geoinfo::citizen_app::sync::{ConnectivityMonitor, IdleReason, NetworkStatus, SyncOrchestrator};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const SETTLE: Duration = Duration::from_secs(2);

fn orchestrator(
    status: NetworkStatus,
    submitter: Arc<RecordingSubmitter>,
) -> (SyncOrchestrator, Arc<QueueStore>, ConnectivityMonitor) {
    let queue = Arc::new(QueueStore::initialize(memory_storage()));
    let monitor = ConnectivityMonitor::new(status);
    let orchestrator = SyncOrchestrator::new(
        Arc::clone(&queue),
        monitor.clone(),
        submitter,
        RetryPolicy::unlimited(),
    );
    (orchestrator, queue, monitor)
}

#[tokio::test]
async fn test_pass_delivers_oldest_first_and_keeps_failures() {
    let submitter = RecordingSubmitter::new();
    submitter.fail_on("Second report");
    let (orchestrator, queue, _) = orchestrator(NetworkStatus::Online, submitter.clone());

    queue.enqueue(incident("First report"), Some(photo(16).into())).await;
    queue.enqueue(incident("Second report"), None).await;
    queue.enqueue(incident("Third report"), None).await;

    let report = orchestrator.sync_now().await;

    assert!(!report.success);
    assert_eq!((report.synced, report.failed), (2, 1));
    assert_eq!(submitter.titles(), vec!["First report", "Third report"]);
    assert_eq!(submitter.deliveries()[0].photo, Some(photo(16)));
    assert_queue_titles!(queue, ["Second report"]);

    let remaining = &queue.list().await[0];
    assert_eq!(remaining.attempts, 1);
    assert_eq!(report.errors[0].id, remaining.id);

    // Next pass retries the survivor
    submitter.recover("Second report");
    let report = orchestrator.sync_now().await;
    assert!(report.success);
    assert_eq!(report.synced, 1);
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_offline_pass_does_nothing() {
    let submitter = RecordingSubmitter::new();
    let (orchestrator, queue, _) = orchestrator(NetworkStatus::Offline, submitter.clone());
    queue.enqueue(incident("Blocked drain"), None).await;

    let report = orchestrator.sync_now().await;

    assert_eq!(report.idle, Some(IdleReason::Offline));
    assert_eq!(submitter.calls(), 0);
    assert_eq!(queue.len().await, 1);
}

#[tokio::test]
async fn test_only_one_pass_at_a_time() {
    let (submitter, gate) = RecordingSubmitter::gated();
    let (orchestrator, queue, _) = orchestrator(NetworkStatus::Online, submitter.clone());
    let orchestrator = Arc::new(orchestrator);
    queue.enqueue(incident("Broken swing"), None).await;
    queue.enqueue(incident("Loose manhole"), None).await;

    let first = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.sync_now().await }
    });
    while submitter.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(orchestrator.is_syncing());

    let second = orchestrator.sync_now().await;
    assert_matches!(second.idle, Some(IdleReason::AlreadySyncing));

    gate.add_permits(2);
    let first = first.await.unwrap();
    assert_eq!(first.synced, 2);
    assert_eq!(submitter.max_in_flight(), 1);
    assert!(!orchestrator.is_syncing());
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_item_enqueued_during_pass_waits_for_next_pass() {
    let (submitter, gate) = RecordingSubmitter::gated();
    let (orchestrator, queue, _) = orchestrator(NetworkStatus::Online, submitter.clone());
    let orchestrator = Arc::new(orchestrator);
    queue.enqueue(incident("Damaged sign"), None).await;

    let pass = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.sync_now().await }
    });
    while submitter.calls() == 0 {
        tokio::task::yield_now().await;
    }
    queue.enqueue(incident("Stray dogs"), None).await;
    gate.add_permits(1);

    assert_eq!(pass.await.unwrap().synced, 1);
    assert_queue_titles!(queue, ["Stray dogs"]);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_syncs_after_settle_delay() {
    let submitter = RecordingSubmitter::new();
    let (mut orchestrator, queue, monitor) = orchestrator(NetworkStatus::Offline, submitter.clone());
    orchestrator.start(SETTLE).unwrap();

    queue.enqueue(incident("Illegal dumping"), None).await;
    queue.enqueue(incident("Flooded underpass"), None).await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(submitter.calls(), 0);

    monitor.set_status(NetworkStatus::Online);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(submitter.calls(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(submitter.titles(), vec!["Illegal dumping", "Flooded underpass"]);
    assert!(queue.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_flapping_connection_postpones_sync() {
    let submitter = RecordingSubmitter::new();
    let (mut orchestrator, queue, monitor) = orchestrator(NetworkStatus::Offline, submitter.clone());
    queue.enqueue(incident("Missing drain cover"), None).await;
    orchestrator.start(SETTLE).unwrap();

    monitor.set_status(NetworkStatus::Online);
    tokio::time::sleep(Duration::from_secs(1)).await;
    monitor.set_status(NetworkStatus::Offline);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(submitter.calls(), 0);

    monitor.set_status(NetworkStatus::Online);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(submitter.calls(), 1);
    assert!(queue.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_enqueue_while_online_syncs_automatically() {
    let submitter = RecordingSubmitter::new();
    let (mut orchestrator, queue, _) = orchestrator(NetworkStatus::Online, submitter.clone());
    orchestrator.start(SETTLE).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    queue.enqueue(incident("Burst water main"), None).await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(submitter.titles(), vec!["Burst water main"]);
    assert!(queue.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_failed_items_wait_for_next_reconnect() {
    let submitter = RecordingSubmitter::new();
    submitter.fail_on("Cracked pavement");
    let (mut orchestrator, queue, monitor) = orchestrator(NetworkStatus::Online, submitter.clone());
    queue.enqueue(incident("Cracked pavement"), None).await;
    orchestrator.start(SETTLE).unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(submitter.calls(), 1);
    assert_eq!(queue.len().await, 1);

    submitter.recover("Cracked pavement");
    monitor.set_status(NetworkStatus::Offline);
    tokio::time::sleep(Duration::from_millis(10)).await;
    monitor.set_status(NetworkStatus::Online);
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(submitter.calls(), 2);
    assert!(queue.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_automatic_sync() {
    let submitter = RecordingSubmitter::new();
    let (mut orchestrator, queue, monitor) = orchestrator(NetworkStatus::Offline, submitter.clone());
    queue.enqueue(incident("Overgrown hedge"), None).await;
    orchestrator.start(SETTLE).unwrap();

    orchestrator.stop();
    monitor.set_status(NetworkStatus::Online);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(!orchestrator.is_running());
    assert_eq!(submitter.calls(), 0);
}

#[tokio::test]
async fn test_clear_during_pass_discards_pending_items() {
    let (submitter, gate) = RecordingSubmitter::gated();
    let (orchestrator, queue, _) = orchestrator(NetworkStatus::Online, submitter.clone());
    let orchestrator = Arc::new(orchestrator);
    for title in ["Item one", "Item two", "Item three"] {
        queue.enqueue(incident(title), None).await;
    }

    let pass = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.sync_now().await }
    });
    while submitter.calls() == 0 {
        tokio::task::yield_now().await;
    }
    queue.clear().await;
    gate.add_permits(3);

    let report = pass.await.unwrap();
    assert_eq!(submitter.titles(), vec!["Item one"]);
    assert_eq!(report.synced, 1);
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_remove_during_pass_skips_removed_item() {
    let (submitter, gate) = RecordingSubmitter::gated();
    let (orchestrator, queue, _) = orchestrator(NetworkStatus::Online, submitter.clone());
    let orchestrator = Arc::new(orchestrator);
    queue.enqueue(incident("Item one"), None).await;
    let withdrawn = queue.enqueue(incident("Item two"), None).await.item;
    queue.enqueue(incident("Item three"), None).await;

    let pass = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.sync_now().await }
    });
    while submitter.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(queue.remove(&withdrawn.id).await);
    gate.add_permits(3);

    let report = pass.await.unwrap();
    assert_eq!(submitter.titles(), vec!["Item one", "Item three"]);
    assert_eq!((report.synced, report.failed), (2, 0));
    assert!(queue.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_stop_lets_submission_in_flight_finish() {
    let (submitter, gate) = RecordingSubmitter::gated();
    let (mut orchestrator, queue, _) = orchestrator(NetworkStatus::Online, submitter.clone());
    queue.enqueue(incident("Sent before stop"), None).await;
    queue.enqueue(incident("Left for later"), None).await;
    orchestrator.start(SETTLE).unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(submitter.calls(), 1);

    orchestrator.stop();
    gate.add_permits(2);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(submitter.titles(), vec!["Sent before stop"]);
    assert_eq!(submitter.calls(), 1);
    assert_queue_titles!(queue, ["Left for later"]);
    assert!(!orchestrator.is_syncing());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_pass() {
    let (submitter, gate) = RecordingSubmitter::gated();
    let (mut orchestrator, queue, _) = orchestrator(NetworkStatus::Online, submitter.clone());
    queue.enqueue(incident("Delivered on shutdown"), None).await;
    orchestrator.start(SETTLE).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    gate.add_permits(1);
    orchestrator.shutdown().await;

    assert!(!orchestrator.is_running());
    assert_eq!(submitter.titles(), vec!["Delivered on shutdown"]);
    assert!(queue.is_empty().await);
}
