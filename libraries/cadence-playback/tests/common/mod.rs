//! Common test fakes and fixtures
//!
//! Every fake writes into a shared call log so tests can assert on the
//! exact order of collaborator calls.
#![allow(dead_code)]

use async_trait::async_trait;
use cadence_core::{
    CadenceError, FavoriteGateway, FavoriteRecord, FavoriteType, Gateways, HistoryGateway,
    LastMetadata, LastPlayedGateway, MediaId, MediaIdCategory, MostPlayedGateway,
    PreferencesGateway, TrackId,
};
use cadence_playback::{
    AudioEngine, AudioFocus, EngineError, EngineResult, HostLifecycle, MediaEntity,
    NoisyReceiver, PlaybackConfig, PlaybackEvent, PlaybackSnapshot, PlayerCollaborators,
    PlayerListener, PlayerTrack, PublishError, QueueEntry, QueuePosition, QueuePublisher,
    QueueWatcher, SessionContext,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;

/// Ordered record of calls across fakes
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }
}

// ===== Track fixtures =====

pub fn entity(id: TrackId, context: MediaId) -> MediaEntity {
    MediaEntity {
        id,
        media_id: context,
        title: format!("Track {id}"),
        artist: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        duration_ms: 30_000,
        is_podcast: false,
    }
}

pub fn track_in(id: TrackId, context: MediaId, index: usize, len: usize) -> PlayerTrack {
    PlayerTrack {
        entity: entity(id, context),
        bookmark_ms: 0,
        position: QueuePosition::new(index, len),
    }
}

pub fn album_track(id: TrackId) -> PlayerTrack {
    track_in(id, MediaId::new(MediaIdCategory::Albums, "10"), 0, 3)
}

pub fn queue_entries(len: usize) -> Vec<QueueEntry> {
    (0..len)
        .map(|position| QueueEntry {
            track_id: position as TrackId + 1,
            title: format!("Track {}", position + 1),
            artist: "Test Artist".to_string(),
            position_in_queue: position,
        })
        .collect()
}

// ===== Engine, focus, route-change, host =====

#[derive(Debug, Default)]
pub struct EngineState {
    pub bookmark_ms: u64,
    pub duration_ms: u64,
    pub playing: bool,
    pub speed: f32,
    pub volume: f32,
    pub fail_next: Option<String>,
}

pub type EngineHandle = Arc<Mutex<EngineState>>;

pub struct FakeEngine {
    log: CallLog,
    state: EngineHandle,
}

impl FakeEngine {
    fn check_failure(&self, call: &str) -> EngineResult<()> {
        self.log.push(format!("engine.{call}"));
        match self.state.lock().unwrap().fail_next.take() {
            Some(message) => Err(EngineError::new(message)),
            None => Ok(()),
        }
    }
}

impl AudioEngine for FakeEngine {
    fn prepare(&mut self, track: &PlayerTrack, bookmark_ms: u64) -> EngineResult<()> {
        self.check_failure("prepare")?;
        let mut state = self.state.lock().unwrap();
        state.bookmark_ms = bookmark_ms;
        state.duration_ms = track.entity.duration_ms;
        state.playing = false;
        Ok(())
    }

    fn play(&mut self, track: &PlayerTrack, has_focus: bool, from_track_end: bool)
        -> EngineResult<()> {
        self.check_failure(&format!("play({has_focus},{from_track_end})"))?;
        let mut state = self.state.lock().unwrap();
        state.bookmark_ms = track.bookmark_ms;
        state.duration_ms = track.entity.duration_ms;
        state.playing = has_focus;
        Ok(())
    }

    fn resume(&mut self) -> EngineResult<()> {
        self.check_failure("resume")?;
        self.state.lock().unwrap().playing = true;
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.check_failure("pause")?;
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> EngineResult<()> {
        self.check_failure(&format!("seek({position_ms})"))?;
        self.state.lock().unwrap().bookmark_ms = position_ms;
        Ok(())
    }

    fn set_playback_speed(&mut self, speed: f32) {
        self.state.lock().unwrap().speed = speed;
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn bookmark_ms(&self) -> u64 {
        self.state.lock().unwrap().bookmark_ms
    }

    fn duration_ms(&self) -> u64 {
        self.state.lock().unwrap().duration_ms
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }
}

pub struct FakeFocus {
    log: CallLog,
    granted: Arc<AtomicBool>,
}

impl AudioFocus for FakeFocus {
    fn request_focus(&mut self) -> bool {
        let granted = self.granted.load(Ordering::SeqCst);
        self.log.push(format!("focus.request={granted}"));
        granted
    }

    fn abandon_focus(&mut self) {
        self.log.push("focus.abandon");
    }
}

pub struct FakeNoisy(CallLog);

impl NoisyReceiver for FakeNoisy {
    fn register(&mut self) {
        self.0.push("noisy.register");
    }

    fn unregister(&mut self) {
        self.0.push("noisy.unregister");
    }
}

pub struct FakeHost(CallLog);

impl HostLifecycle for FakeHost {
    fn start(&mut self) {
        self.0.push("host.start");
    }

    fn stop(&mut self) {
        self.0.push("host.stop");
    }
}

/// Shared handles into a set of fake collaborators
pub struct Fakes {
    pub log: CallLog,
    pub engine: EngineHandle,
    pub focus_granted: Arc<AtomicBool>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            engine: Arc::new(Mutex::new(EngineState {
                speed: 1.0,
                volume: 1.0,
                ..EngineState::default()
            })),
            focus_granted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn collaborators(&self) -> PlayerCollaborators {
        PlayerCollaborators {
            engine: Box::new(FakeEngine {
                log: self.log.clone(),
                state: self.engine.clone(),
            }),
            focus: Box::new(FakeFocus {
                log: self.log.clone(),
                granted: self.focus_granted.clone(),
            }),
            noisy: Box::new(FakeNoisy(self.log.clone())),
            host: Box::new(FakeHost(self.log.clone())),
        }
    }

    pub fn deny_focus(&self) {
        self.focus_granted.store(false, Ordering::SeqCst);
    }

    pub fn fail_next_engine_call(&self, message: &str) {
        self.engine.lock().unwrap().fail_next = Some(message.to_string());
    }

    pub fn set_engine_position(&self, bookmark_ms: u64, duration_ms: u64) {
        let mut engine = self.engine.lock().unwrap();
        engine.bookmark_ms = bookmark_ms;
        engine.duration_ms = duration_ms;
    }
}

// ===== Listener =====

/// Listener that writes every notification into the call log
pub struct RecordingListener(pub CallLog);

impl PlayerListener for RecordingListener {
    fn on_prepare(&self, event: &PlaybackEvent) {
        self.0.push(format!("listener.prepare({})", event.track_id));
    }

    fn on_state_changed(&self, snapshot: &PlaybackSnapshot) {
        self.0.push(format!("listener.state({:?})", snapshot.state));
    }

    fn on_metadata_changed(&self, event: &PlaybackEvent) {
        self.0.push(format!("listener.metadata({})", event.track_id));
    }

    fn on_seek(&self, position_ms: u64) {
        self.0.push(format!("listener.seek({position_ms})"));
    }

    fn on_engine_failure(&self, track_id: Option<TrackId>, error: &EngineError) {
        self.0
            .push(format!("listener.failure({track_id:?},{})", error.message()));
    }
}

// ===== Persistence gateways =====

/// In-memory store implementing every gateway
///
/// Writes are recorded as `op:argument` strings in call order. Delays can
/// be configured per track to force overlapping work.
#[derive(Default)]
pub struct FakeStore {
    pub ops: CallLog,
    favorites: Mutex<HashSet<TrackId>>,
    favorite_delays: Mutex<HashMap<TrackId, Duration>>,
    history_delays: Mutex<HashMap<TrackId, Duration>>,
    committed_favorites: Mutex<Vec<FavoriteRecord>>,
    metadata_writes: Mutex<Vec<LastMetadata>>,
    speed: Mutex<Option<f32>>,
    fail_writes: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mark_favorite(&self, track_id: TrackId) {
        self.favorites.lock().unwrap().insert(track_id);
    }

    pub fn delay_favorite_check(&self, track_id: TrackId, delay: Duration) {
        self.favorite_delays.lock().unwrap().insert(track_id, delay);
    }

    pub fn delay_history(&self, track_id: TrackId, delay: Duration) {
        self.history_delays.lock().unwrap().insert(track_id, delay);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn set_saved_speed(&self, speed: f32) {
        *self.speed.lock().unwrap() = Some(speed);
    }

    pub fn saved_speed(&self) -> Option<f32> {
        *self.speed.lock().unwrap()
    }

    pub fn committed_favorites(&self) -> Vec<FavoriteRecord> {
        self.committed_favorites.lock().unwrap().clone()
    }

    pub fn metadata_writes(&self) -> Vec<LastMetadata> {
        self.metadata_writes.lock().unwrap().clone()
    }

    /// Highest number of ordered writes observed running at once
    pub fn max_concurrent_ordered_writes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn gateways(self: &Arc<Self>) -> Gateways {
        Gateways::from_store(self.clone())
    }

    fn check_write(&self) -> cadence_core::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(CadenceError::storage("disk full"))
        } else {
            Ok(())
        }
    }

    async fn ordered_write(&self, op: String, delay: Option<Duration>) -> cadence_core::Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.check_write()?;
        self.ops.push(op);
        Ok(())
    }
}

#[async_trait]
impl HistoryGateway for FakeStore {
    async fn insert_history(&self, track_id: TrackId, is_podcast: bool) -> cadence_core::Result<()> {
        let delay = self.history_delays.lock().unwrap().get(&track_id).copied();
        self.ordered_write(format!("history:{track_id}:{is_podcast}"), delay)
            .await
    }
}

#[async_trait]
impl FavoriteGateway for FakeStore {
    async fn is_favorite(&self, track_id: TrackId, _kind: FavoriteType) -> cadence_core::Result<bool> {
        let delay = self.favorite_delays.lock().unwrap().get(&track_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.favorites.lock().unwrap().contains(&track_id))
    }

    async fn update_favorite_state(&self, record: FavoriteRecord) -> cadence_core::Result<()> {
        self.committed_favorites.lock().unwrap().push(record);
        Ok(())
    }
}

#[async_trait]
impl LastPlayedGateway for FakeStore {
    async fn insert_last_played_artist(&self, media_id: &MediaId) -> cadence_core::Result<()> {
        self.ordered_write(format!("last_artist:{media_id}"), None)
            .await
    }

    async fn insert_last_played_album(&self, media_id: &MediaId) -> cadence_core::Result<()> {
        self.ordered_write(format!("last_album:{media_id}"), None)
            .await
    }
}

#[async_trait]
impl MostPlayedGateway for FakeStore {
    async fn insert_most_played(&self, media_id: &MediaId) -> cadence_core::Result<()> {
        self.ordered_write(format!("most_played:{media_id}"), None)
            .await
    }
}

#[async_trait]
impl PreferencesGateway for FakeStore {
    async fn set_last_metadata(&self, metadata: LastMetadata) -> cadence_core::Result<()> {
        self.check_write()?;
        self.metadata_writes.lock().unwrap().push(metadata);
        Ok(())
    }

    async fn last_metadata(&self) -> cadence_core::Result<Option<LastMetadata>> {
        Ok(self.metadata_writes.lock().unwrap().last().cloned())
    }

    async fn playback_speed(&self) -> cadence_core::Result<Option<f32>> {
        Ok(*self.speed.lock().unwrap())
    }

    async fn set_playback_speed(&self, speed: f32) -> cadence_core::Result<()> {
        self.check_write()?;
        *self.speed.lock().unwrap() = Some(speed);
        Ok(())
    }
}

// ===== Queue publication =====

/// Publisher that records what it received and when
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(Instant, Vec<QueueEntry>)>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let publisher = Self::default();
        publisher.fail.store(true, Ordering::SeqCst);
        Arc::new(publisher)
    }

    pub fn published(&self) -> Vec<(Instant, Vec<QueueEntry>)> {
        self.published.lock().unwrap().clone()
    }
}

impl QueuePublisher for RecordingPublisher {
    fn publish_queue(&self, queue: &[QueueEntry]) -> Result<(), PublishError> {
        self.published
            .lock()
            .unwrap()
            .push((Instant::now(), queue.to_vec()));
        if self.fail.load(Ordering::SeqCst) {
            Err(PublishError("session gone".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct CountingWatcher(pub AtomicUsize);

impl QueueWatcher for CountingWatcher {
    fn on_queue_changed(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

// ===== Session helpers =====

pub fn context(store: &Arc<FakeStore>) -> SessionContext {
    SessionContext::new(Handle::current(), store.gateways(), PlaybackConfig::default())
}

/// Event as the orchestrator would emit it for `track`
pub fn event_for(track: &PlayerTrack) -> PlaybackEvent {
    PlaybackEvent::from(&track.entity)
}
