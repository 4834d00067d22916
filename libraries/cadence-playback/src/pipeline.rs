//! Sequential event pipeline
//!
//! Turns "track became current" events into persistence side effects.
//!
//! - Ordered steps (last played, most played, history) run on a single
//!   worker in arrival order, one event at a time. The inbox is unbounded
//!   and never drops events.
//! - Favorite reconciliation runs outside the ordered stream. Each new
//!   event aborts the previous check, and a generation check keeps a
//!   superseded result from being committed.
//! - Last metadata is written on every event through a latest-wins
//!   writer, so a stale write never lands after a newer one.
//!
//! Every gateway failure is logged and swallowed; nothing propagates back
//! to the orchestrator.

use crate::error::{PlaybackError, Result};
use crate::events::{PlaybackEvent, PlayerListener};
use crate::session::SessionContext;
use cadence_core::{
    FavoriteGateway, FavoriteRecord, FavoriteType, Gateways, LastMetadata, MediaId,
    PreferencesGateway, TrackId,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How the pipeline winds down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Process every event already queued, then stop
    Drain,
    /// Finish only the event in progress; queued events are discarded
    Immediate,
}

enum Job {
    Event(PlaybackEvent),
    Flush(oneshot::Sender<()>),
    Stop,
}

type MetadataSlot = Option<(u64, LastMetadata)>;

pub struct EventPipeline {
    runtime: Handle,
    inbox: mpsc::UnboundedSender<Job>,
    favorites: Arc<dyn FavoriteGateway>,
    cancel: CancellationToken,

    worker: Mutex<Option<JoinHandle<()>>>,

    // Favorite reconciliation
    favorite_task: Mutex<Option<JoinHandle<()>>>,
    favorite_generation: Arc<AtomicU64>,
    favorite_settled: Arc<watch::Sender<u64>>,

    // Last metadata writer
    metadata_seq: AtomicU64,
    metadata_tx: watch::Sender<MetadataSlot>,
    metadata_written: watch::Receiver<u64>,
    metadata_drain: CancellationToken,
    metadata_writer: Mutex<Option<JoinHandle<()>>>,
}

impl EventPipeline {
    /// Start the pipeline workers on the session runtime
    pub fn spawn(context: &SessionContext) -> Arc<Self> {
        let runtime = context.runtime().clone();
        let cancel = context.cancel_token().child_token();
        let gateways = context.gateways().clone();

        let (inbox, jobs) = mpsc::unbounded_channel();
        let worker = runtime.spawn(run_ordered(jobs, gateways.clone(), cancel.clone()));

        let (metadata_tx, metadata_rx) = watch::channel(None);
        let (written_tx, metadata_written) = watch::channel(0);
        let metadata_drain = CancellationToken::new();
        let metadata_writer = runtime.spawn(run_metadata_writer(
            metadata_rx,
            written_tx,
            gateways.preferences.clone(),
            cancel.clone(),
            metadata_drain.clone(),
        ));

        let (favorite_settled, _) = watch::channel(0);

        Arc::new(Self {
            runtime,
            inbox,
            favorites: gateways.favorites,
            cancel,
            worker: Mutex::new(Some(worker)),
            favorite_task: Mutex::new(None),
            favorite_generation: Arc::new(AtomicU64::new(0)),
            favorite_settled: Arc::new(favorite_settled),
            metadata_seq: AtomicU64::new(0),
            metadata_tx,
            metadata_written,
            metadata_drain,
            metadata_writer: Mutex::new(Some(metadata_writer)),
        })
    }

    /// Queue an event for the ordered steps
    pub fn enqueue(&self, event: PlaybackEvent) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PlaybackError::SessionClosed);
        }
        self.inbox
            .send(Job::Event(event))
            .map_err(|_| PlaybackError::SessionClosed)
    }

    /// Wait until every event enqueued before this call has been processed
    ///
    /// Also waits for the last metadata write and the latest favorite
    /// check issued before the call.
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.inbox
            .send(Job::Flush(done_tx))
            .map_err(|_| PlaybackError::SessionClosed)?;
        let metadata_target = self.metadata_seq.load(Ordering::SeqCst);
        let favorite_target = self.favorite_generation.load(Ordering::SeqCst);

        let mut metadata_written = self.metadata_written.clone();
        let mut favorite_settled = self.favorite_settled.subscribe();
        let settled = async {
            done_rx.await.ok()?;
            metadata_written
                .wait_for(|&seq| seq >= metadata_target)
                .await
                .ok()?;
            favorite_settled
                .wait_for(|&generation| generation >= favorite_target)
                .await
                .ok()?;
            Some(())
        };

        tokio::select! {
            () = self.cancel.cancelled() => Err(PlaybackError::SessionClosed),
            settled = settled => settled.ok_or(PlaybackError::SessionClosed),
        }
    }

    /// Stop the workers
    ///
    /// Favorite checks are always aborted. With `Drain` the ordered worker
    /// processes everything already queued and the pending last metadata
    /// is written; with `Immediate` only the event in progress completes.
    pub async fn shutdown(&self, mode: ShutdownMode) {
        self.abort_favorite_task();

        match mode {
            ShutdownMode::Drain => {
                // Stop lands behind every queued event
                let _ = self.inbox.send(Job::Stop);
                self.metadata_drain.cancel();
            }
            ShutdownMode::Immediate => self.cancel.cancel(),
        }

        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
        let writer = lock(&self.metadata_writer).take();
        if let Some(writer) = writer {
            let _ = writer.await;
        }

        self.cancel.cancel();
        debug!(?mode, "Event pipeline shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Restart favorite reconciliation for the event's item
    fn update_favorite(&self, event: &PlaybackEvent) {
        let generation = self.favorite_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut slot = lock(&self.favorite_task);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        if self.cancel.is_cancelled() {
            return;
        }

        *slot = Some(self.runtime.spawn(reconcile_favorite(
            self.favorites.clone(),
            event.track_id,
            FavoriteType::for_item(event.is_podcast),
            generation,
            self.favorite_generation.clone(),
            self.favorite_settled.clone(),
        )));
    }

    fn abort_favorite_task(&self) {
        if let Some(task) = lock(&self.favorite_task).take() {
            task.abort();
        }
    }

    /// Hand the event's metadata to the latest-wins writer
    fn save_last_metadata(&self, event: &PlaybackEvent) {
        let seq = self.metadata_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.metadata_tx.send_replace(Some((
            seq,
            LastMetadata {
                title: event.title.clone(),
                artist: event.artist.clone(),
                id: event.track_id,
            },
        )));
    }
}

impl PlayerListener for EventPipeline {
    fn on_prepare(&self, event: &PlaybackEvent) {
        self.update_favorite(event);
        self.save_last_metadata(event);
    }

    fn on_metadata_changed(&self, event: &PlaybackEvent) {
        if let Err(e) = self.enqueue(event.clone()) {
            debug!(track_id = event.track_id, error = %e, "Dropping event after shutdown");
        }
        self.update_favorite(event);
        self.save_last_metadata(event);
    }
}

impl Drop for EventPipeline {
    fn drop(&mut self) {
        self.abort_favorite_task();
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for EventPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPipeline")
            .field("shut_down", &self.cancel.is_cancelled())
            .field(
                "favorite_generation",
                &self.favorite_generation.load(Ordering::SeqCst),
            )
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_ordered(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    gateways: Gateways,
    cancel: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        match job {
            // Never interrupted by cancellation once started
            Job::Event(event) => process_event(&gateways, &event).await,
            Job::Flush(done) => {
                let _ = done.send(());
            }
            Job::Stop => break,
        }
    }
    debug!("Ordered event worker stopped");
}

/// The fixed per-event sequence of ordered side effects
async fn process_event(gateways: &Gateways, event: &PlaybackEvent) {
    let context = &event.context;
    debug!(track_id = event.track_id, %context, "Processing playback event");

    if context.is_artist() || context.is_podcast_artist() {
        if let Err(e) = gateways.last_played.insert_last_played_artist(context).await {
            warn!(%context, error = %e, "Failed to record last played artist");
        }
    } else if context.is_album() || context.is_podcast_album() {
        if let Err(e) = gateways.last_played.insert_last_played_album(context).await {
            warn!(%context, error = %e, "Failed to record last played album");
        }
    }

    // Best effort: contexts that cannot hold playable items are skipped
    match MediaId::playable_item(context, event.track_id) {
        Ok(item) => {
            if let Err(e) = gateways.most_played.insert_most_played(&item).await {
                warn!(%item, error = %e, "Failed to record most played");
            }
        }
        Err(e) => debug!(%context, error = %e, "Not counting most played"),
    }

    if let Err(e) = gateways
        .history
        .insert_history(event.track_id, event.is_podcast)
        .await
    {
        warn!(track_id = event.track_id, error = %e, "Failed to insert history");
    }
}

async fn reconcile_favorite(
    favorites: Arc<dyn FavoriteGateway>,
    track_id: TrackId,
    kind: FavoriteType,
    generation: u64,
    current: Arc<AtomicU64>,
    settled: Arc<watch::Sender<u64>>,
) {
    let outcome: cadence_core::Result<()> = async {
        let is_favorite = favorites.is_favorite(track_id, kind).await?;
        if current.load(Ordering::SeqCst) != generation {
            debug!(track_id, "Favorite check superseded");
            return Ok(());
        }
        favorites
            .update_favorite_state(FavoriteRecord {
                track_id,
                state: is_favorite.into(),
                kind,
            })
            .await
    }
    .await;

    if let Err(e) = outcome {
        warn!(track_id, error = %e, "Failed to reconcile favorite state");
    }
    settled.send_if_modified(|settled| {
        if generation > *settled {
            *settled = generation;
            true
        } else {
            false
        }
    });
}

async fn run_metadata_writer(
    mut pending: watch::Receiver<MetadataSlot>,
    written: watch::Sender<u64>,
    preferences: Arc<dyn PreferencesGateway>,
    cancel: CancellationToken,
    drain: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = drain.cancelled() => {
                if pending.has_changed().unwrap_or(false) {
                    write_last_metadata(&mut pending, &written, preferences.as_ref()).await;
                }
                break;
            }
            changed = pending.changed() => {
                if changed.is_err() {
                    break;
                }
                write_last_metadata(&mut pending, &written, preferences.as_ref()).await;
            }
        }
    }
}

async fn write_last_metadata(
    pending: &mut watch::Receiver<MetadataSlot>,
    written: &watch::Sender<u64>,
    preferences: &dyn PreferencesGateway,
) {
    let latest = pending.borrow_and_update().clone();
    let Some((seq, metadata)) = latest else {
        return;
    };
    if let Err(e) = preferences.set_last_metadata(metadata).await {
        warn!(seq, error = %e, "Failed to save last metadata");
    }
    written.send_replace(seq);
}
