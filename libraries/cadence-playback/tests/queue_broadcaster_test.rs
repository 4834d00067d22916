//! Queue broadcaster timing tests
//!
//! Run on a paused clock: sleeps advance virtual time, so debounce windows
//! can be asserted exactly.

mod common;

use cadence_playback::{
    PlaybackError, PlaybackStateMachine, QueueBroadcaster, QueuePublisher, QueueUpdate,
    QueueWatcher, SharedPlayerState,
};
use common::{context, queue_entries, CountingWatcher, FakeStore, RecordingPublisher};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

struct Harness {
    broadcaster: QueueBroadcaster,
    publisher: Arc<RecordingPublisher>,
    watcher: Arc<CountingWatcher>,
    state: SharedPlayerState,
}

fn harness(publisher: Arc<RecordingPublisher>) -> Harness {
    let store = FakeStore::new();
    let state = SharedPlayerState::new(PlaybackStateMachine::new(1.0).unwrap());
    let watcher = Arc::new(CountingWatcher::default());
    let broadcaster = QueueBroadcaster::spawn(
        &context(&store),
        state.clone(),
        publisher.clone() as Arc<dyn QueuePublisher>,
        vec![watcher.clone() as Arc<dyn QueueWatcher>],
    );
    Harness {
        broadcaster,
        publisher,
        watcher,
        state,
    }
}

fn update(active_id: usize, len: usize, immediate: bool) -> QueueUpdate {
    QueueUpdate {
        active_id,
        queue: queue_entries(len),
        immediate,
    }
}

#[tokio::test(start_paused = true)]
async fn burst_of_debounced_updates_dispatches_only_the_latest() {
    let h = harness(RecordingPublisher::new());

    h.broadcaster.on_next(update(0, 2, false)).unwrap();
    sleep(Duration::from_millis(200)).await;
    let second_at = Instant::now();
    h.broadcaster.on_next(update(1, 3, false)).unwrap();
    sleep(Duration::from_secs(2)).await;

    let published = h.publisher.published();
    assert_eq!(published.len(), 1);
    let (dispatched_at, queue) = &published[0];
    assert_eq!(queue, &queue_entries(3));
    assert!(*dispatched_at - second_at >= Duration::from_millis(500));
    assert_eq!(h.watcher.0.load(Ordering::SeqCst), 1);
    assert_eq!(h.state.snapshot().active_queue_slot, Some(1));
}

#[tokio::test(start_paused = true)]
async fn immediate_update_skips_the_debounce() {
    let h = harness(RecordingPublisher::new());
    let start = Instant::now();

    h.broadcaster.on_next(update(2, 4, true)).unwrap();
    sleep(Duration::from_millis(1)).await;

    let published = h.publisher.published();
    assert_eq!(published.len(), 1);
    assert!(published[0].0 - start < Duration::from_millis(500));

    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.active_queue_slot, Some(2));
    assert!(snapshot.can_skip_previous);
    assert!(snapshot.can_skip_next);
}

#[tokio::test(start_paused = true)]
async fn dispatch_records_the_active_track() {
    let h = harness(RecordingPublisher::new());

    h.broadcaster.on_next(update(2, 4, true)).unwrap();
    sleep(Duration::from_millis(1)).await;

    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.active_queue_slot, Some(2));
    assert_eq!(snapshot.track_id, Some(3));
}

#[tokio::test(start_paused = true)]
async fn missing_active_entry_keeps_the_track() {
    let h = harness(RecordingPublisher::new());
    h.state.transition(|sm| sm.prepare(7, 0));

    // No entry sits at position 9
    h.broadcaster.on_next(update(9, 4, true)).unwrap();
    sleep(Duration::from_millis(1)).await;

    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.active_queue_slot, Some(9));
    assert_eq!(snapshot.track_id, Some(7));
}

#[tokio::test(start_paused = true)]
async fn immediate_update_supersedes_a_pending_one() {
    let h = harness(RecordingPublisher::new());
    let start = Instant::now();

    h.broadcaster.on_next(update(0, 2, false)).unwrap();
    sleep(Duration::from_millis(100)).await;
    h.broadcaster.on_next(update(4, 5, true)).unwrap();
    sleep(Duration::from_secs(2)).await;

    let published = h.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1, queue_entries(5));
    assert!(published[0].0 - start < Duration::from_millis(500));
    assert_eq!(h.state.snapshot().active_queue_slot, Some(4));
}

#[tokio::test(start_paused = true)]
async fn spaced_updates_are_each_dispatched() {
    let h = harness(RecordingPublisher::new());

    h.broadcaster.on_next(update(0, 2, false)).unwrap();
    sleep(Duration::from_secs(1)).await;
    h.broadcaster.on_next(update(1, 2, false)).unwrap();
    sleep(Duration::from_secs(1)).await;

    assert_eq!(h.publisher.published().len(), 2);
    assert_eq!(h.watcher.0.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn publication_failure_does_not_block_later_updates() {
    let h = harness(RecordingPublisher::failing());

    h.broadcaster.on_next(update(0, 2, true)).unwrap();
    sleep(Duration::from_millis(10)).await;
    h.broadcaster.on_next(update(1, 2, true)).unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(h.publisher.published().len(), 2);
    assert_eq!(h.watcher.0.load(Ordering::SeqCst), 2);
    assert_eq!(h.state.snapshot().active_queue_slot, Some(1));
}

#[tokio::test(start_paused = true)]
async fn shutdown_discards_pending_update() {
    let h = harness(RecordingPublisher::new());

    h.broadcaster.on_next(update(0, 2, false)).unwrap();
    h.broadcaster.shutdown().await;
    sleep(Duration::from_secs(1)).await;

    assert!(h.publisher.published().is_empty());
    assert!(matches!(
        h.broadcaster.on_next(update(1, 2, true)),
        Err(PlaybackError::SessionClosed)
    ));
}
