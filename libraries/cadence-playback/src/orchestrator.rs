//! Playback orchestrator
//!
//! Façade for play/pause/seek/skip intents. Talks to the audio engine and
//! the focus arbiter, drives the state machine, and fans transitions out
//! to listeners.
//!
//! Operations take `&mut self`: the orchestrator is the single writer of
//! the playback snapshot and callers serialize intents.

use crate::collaborators::{
    AudioEngine, AudioFocus, EngineError, HostLifecycle, NoisyReceiver, PlayerCollaborators,
};
use crate::error::{PlaybackError, Result};
use crate::events::{PlaybackEvent, PlayerListener};
use crate::state::{check_speed, PlaybackStateMachine, SharedPlayerState};
use crate::types::{
    PlaybackConfig, PlaybackSnapshot, PlaybackState, PlayerTrack, SkipDirection, SkipType,
};
use cadence_core::TrackId;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error};

pub struct PlaybackOrchestrator {
    state: SharedPlayerState,
    engine: Box<dyn AudioEngine>,
    focus: Box<dyn AudioFocus>,
    noisy: Box<dyn NoisyReceiver>,
    host: Box<dyn HostLifecycle>,
    listeners: Vec<Arc<dyn PlayerListener>>,

    /// Speed re-applied to the engine on every prepare and play
    speed: f32,

    released: bool,
}

impl PlaybackOrchestrator {
    /// Create an orchestrator over a fresh state machine
    pub fn new(collaborators: PlayerCollaborators, config: &PlaybackConfig) -> Result<Self> {
        let machine = PlaybackStateMachine::new(config.default_speed)?;
        Ok(Self::with_state(collaborators, SharedPlayerState::new(machine)))
    }

    /// Create an orchestrator driving an existing shared state
    ///
    /// The initial speed is taken from the state's snapshot.
    pub fn with_state(collaborators: PlayerCollaborators, state: SharedPlayerState) -> Self {
        let PlayerCollaborators {
            mut engine,
            focus,
            noisy,
            host,
        } = collaborators;
        let speed = state.snapshot().speed;
        engine.set_playback_speed(speed);

        Self {
            state,
            engine,
            focus,
            noisy,
            host,
            listeners: Vec::new(),
            speed,
            released: false,
        }
    }

    // ===== Transitions =====

    /// Load a track at its bookmark without starting output
    pub fn on_prepare(&mut self, track: &PlayerTrack) -> Result<()> {
        self.ensure_open()?;
        let track_id = track.entity.id;
        debug!(track_id, bookmark_ms = track.bookmark_ms, "Preparing track");

        if let Err(e) = self.engine.prepare(track, track.bookmark_ms) {
            return Err(self.engine_failure(Some(track_id), e));
        }
        self.engine.set_playback_speed(self.speed);

        let speed = self.speed;
        let duration_ms = self.track_duration(track);
        self.state.transition(|sm| {
            sm.prepare(track_id, track.bookmark_ms);
            sm.set_track_duration(duration_ms);
            sm.set_speed(speed)?;
            Ok::<_, PlaybackError>(sm.toggle_skip_actions(track.position))
        })?;

        let event = PlaybackEvent::from(&track.entity);
        self.notify(|listener| listener.on_prepare(&event));
        Ok(())
    }

    /// Play a track on an explicit user intent
    pub fn on_play(&mut self, track: &PlayerTrack) -> Result<()> {
        self.ensure_open()?;
        self.play_internal(track, SkipType::None)
    }

    /// Play a track reached by skipping or by the previous track ending
    ///
    /// # Errors
    /// `InvalidTransition` when `skip_type` is `SkipType::None`; use
    /// [`Self::on_play`] for plain play intents.
    pub fn on_play_next(&mut self, track: &PlayerTrack, skip_type: SkipType) -> Result<()> {
        self.ensure_open()?;
        let direction = skip_type.direction().ok_or_else(|| {
            PlaybackError::invalid_transition("on_play_next requires a directional skip type")
        })?;

        self.state.transition(|sm| sm.skip_to(direction == SkipDirection::Next));
        self.play_internal(track, skip_type)
    }

    fn play_internal(&mut self, track: &PlayerTrack, skip_type: SkipType) -> Result<()> {
        let track_id = track.entity.id;
        let has_focus = self.focus.request_focus();
        if !has_focus {
            debug!(track_id, "Audio focus denied, loading track paused");
        }

        let from_track_end = skip_type == SkipType::TrackEnded;
        if let Err(e) = self.engine.play(track, has_focus, from_track_end) {
            return Err(self.engine_failure(Some(track_id), e));
        }

        let state = if has_focus {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        };
        let speed = self.speed;
        let duration_ms = self.track_duration(track);
        let snapshot = self.state.transition(|sm| {
            sm.update(state, track.bookmark_ms, Some(track_id), Some(speed))?;
            sm.set_track_duration(duration_ms);
            Ok::<_, PlaybackError>(sm.toggle_skip_actions(track.position))
        })?;

        let event = PlaybackEvent::from(&track.entity);
        self.notify(|listener| {
            listener.on_state_changed(&snapshot);
            listener.on_metadata_changed(&event);
        });

        self.noisy.register();
        self.host.start();
        Ok(())
    }

    /// Resume the loaded track
    ///
    /// When focus is denied this returns `Ok` without touching the engine,
    /// the state, or listeners.
    pub fn on_resume(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.focus.request_focus() {
            debug!("Audio focus denied, ignoring resume");
            return Ok(());
        }

        if let Err(e) = self.engine.resume() {
            let track_id = self.state.snapshot().track_id;
            return Err(self.engine_failure(track_id, e));
        }

        let bookmark_ms = self.engine.bookmark_ms();
        let speed = self.speed;
        let snapshot = self
            .state
            .transition(|sm| sm.update(PlaybackState::Playing, bookmark_ms, None, Some(speed)))?;
        self.notify(|listener| listener.on_state_changed(&snapshot));

        self.host.start();
        self.noisy.register();
        Ok(())
    }

    /// Pause output
    ///
    /// # Arguments
    /// * `stop_host` - Also stop the host lifecycle
    /// * `release_focus` - Also abandon audio focus
    pub fn on_pause(&mut self, stop_host: bool, release_focus: bool) -> Result<()> {
        self.ensure_open()?;
        if let Err(e) = self.engine.pause() {
            let track_id = self.state.snapshot().track_id;
            return Err(self.engine_failure(track_id, e));
        }

        let bookmark_ms = self.engine.bookmark_ms();
        let speed = self.speed;
        let snapshot = self
            .state
            .transition(|sm| sm.update(PlaybackState::Paused, bookmark_ms, None, Some(speed)))?;
        self.notify(|listener| listener.on_state_changed(&snapshot));

        self.noisy.unregister();
        if release_focus {
            self.focus.abandon_focus();
        }
        if stop_host {
            self.host.stop();
        }
        Ok(())
    }

    /// Move the play head
    ///
    /// The resulting state follows the engine's play state, and the host
    /// lifecycle is started or stopped to match.
    pub fn on_seek(&mut self, position_ms: u64) -> Result<()> {
        self.ensure_open()?;
        if let Err(e) = self.engine.seek_to(position_ms) {
            let track_id = self.state.snapshot().track_id;
            return Err(self.engine_failure(track_id, e));
        }

        let playing = self.engine.is_playing();
        let state = if playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        };
        let speed = self.speed;
        let snapshot = self
            .state
            .transition(|sm| sm.update(state, position_ms, None, Some(speed)))?;
        // Listeners see the clamped position the snapshot holds
        let position_ms = snapshot.bookmark_ms;
        self.notify(|listener| {
            listener.on_state_changed(&snapshot);
            listener.on_seek(position_ms);
        });

        if playing {
            self.host.start();
        } else {
            self.host.stop();
        }
        Ok(())
    }

    /// Seek `seconds` forward, stopping at the end of the track
    ///
    /// When neither the engine nor the snapshot knows the duration, there
    /// is no end to stop at and the target is used as is.
    pub fn on_forward_by(&mut self, seconds: u32) -> Result<()> {
        self.seek_by(i64::from(seconds) * 1000)
    }

    /// Seek `seconds` back, stopping at the start of the track
    pub fn on_replay_by(&mut self, seconds: u32) -> Result<()> {
        self.seek_by(-(i64::from(seconds) * 1000))
    }

    fn seek_by(&mut self, delta_ms: i64) -> Result<()> {
        let bookmark = self.engine.bookmark_ms() as i64;
        let target = bookmark.saturating_add(delta_ms).max(0);
        // An unknown duration leaves the upper end open
        let target = match self.duration_ms() {
            0 => target,
            duration => target.min(duration as i64),
        };
        self.on_seek(target as u64)
    }

    // ===== Settings =====

    /// Change the playback speed without touching play state
    pub fn set_playback_speed(&mut self, speed: f32) -> Result<()> {
        self.ensure_open()?;
        let speed = check_speed(speed)?;
        self.engine.set_playback_speed(speed);
        self.speed = speed;

        let snapshot = self.state.transition(|sm| sm.set_speed(speed))?;
        self.notify(|listener| listener.on_state_changed(&snapshot));
        Ok(())
    }

    /// Output volume, clamped to [0.0, 1.0]
    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.engine.set_volume(volume);
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    // ===== Queries =====

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    /// Engine play head in milliseconds
    pub fn bookmark(&self) -> u64 {
        self.engine.bookmark_ms()
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.snapshot()
    }

    /// Receiver that observes every snapshot the orchestrator produces
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state.subscribe()
    }

    /// Shared state handle, for components that keep slot bookkeeping
    pub fn shared_state(&self) -> SharedPlayerState {
        self.state.clone()
    }

    // ===== Lifecycle =====

    pub fn stop_host(&mut self) {
        self.host.stop();
    }

    /// Register a listener; notifications follow registration order
    pub fn add_listener(&mut self, listener: Arc<dyn PlayerListener>) {
        self.listeners.push(listener);
    }

    /// Remove a listener registered earlier
    ///
    /// Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, listener: &Arc<dyn PlayerListener>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Session teardown: drop listeners and abandon focus
    ///
    /// Every later intent fails with `SessionClosed`.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.listeners.clear();
        self.focus.abandon_focus();
        debug!("Playback orchestrator released");
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    // ===== Helpers =====

    fn ensure_open(&self) -> Result<()> {
        if self.released {
            Err(PlaybackError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn notify(&self, f: impl Fn(&dyn PlayerListener)) {
        for listener in &self.listeners {
            f(listener.as_ref());
        }
    }

    fn track_duration(&self, track: &PlayerTrack) -> u64 {
        match track.entity.duration_ms {
            0 => self.engine.duration_ms(),
            duration => duration,
        }
    }

    fn duration_ms(&self) -> u64 {
        match self.engine.duration_ms() {
            0 => self.state.snapshot().duration_ms,
            duration => duration,
        }
    }

    /// Halt the current track and report the failure
    fn engine_failure(&mut self, track_id: Option<TrackId>, err: EngineError) -> PlaybackError {
        error!(?track_id, error = %err, "Audio engine failure, halting playback");

        let snapshot = self.state.transition(PlaybackStateMachine::halt);
        self.noisy.unregister();
        self.host.stop();
        self.notify(|listener| {
            listener.on_state_changed(&snapshot);
            listener.on_engine_failure(track_id, &err);
        });

        PlaybackError::EngineFailure(err)
    }
}

impl std::fmt::Debug for PlaybackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackOrchestrator")
            .field("snapshot", &self.state.snapshot())
            .field("speed", &self.speed)
            .field("listeners", &self.listeners.len())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
