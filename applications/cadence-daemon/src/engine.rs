//! Clock-driven engine and local platform collaborators
//!
//! The daemon produces no audio. [`SilentEngine`] advances a virtual
//! position on the tokio clock so that seeking, speed changes and track
//! ends behave like a real engine would.

use cadence_core::TrackId;
use cadence_playback::{
    AudioEngine, AudioFocus, EngineError, EngineResult, HostLifecycle, NoisyReceiver,
    PlayerCollaborators, PlayerTrack,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug)]
struct Clock {
    loaded: Option<TrackId>,
    duration_ms: u64,
    /// Position when the clock last stopped or changed speed
    base_ms: u64,
    /// Set while running
    started_at: Option<Instant>,
    speed: f32,
    volume: f32,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            loaded: None,
            duration_ms: 0,
            base_ms: 0,
            started_at: None,
            speed: 1.0,
            volume: 1.0,
        }
    }
}

impl Clock {
    fn position(&self) -> u64 {
        let advanced = self.started_at.map_or(0, |started| {
            (started.elapsed().as_millis() as f64 * f64::from(self.speed)) as u64
        });
        let position = self.base_ms.saturating_add(advanced);
        if self.duration_ms > 0 {
            position.min(self.duration_ms)
        } else {
            position
        }
    }

    fn freeze(&mut self) {
        self.base_ms = self.position();
        self.started_at = None;
    }

    fn run(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn load(&mut self, track: &PlayerTrack, bookmark_ms: u64) -> EngineResult<()> {
        if track.entity.duration_ms == 0 {
            return Err(EngineError::new(format!(
                "track {} has no playable length",
                track.entity.id
            )));
        }
        self.loaded = Some(track.entity.id);
        self.duration_ms = track.entity.duration_ms;
        self.base_ms = bookmark_ms.min(self.duration_ms);
        self.started_at = None;
        Ok(())
    }
}

/// Shared view of the engine clock
///
/// The orchestrator owns the engine; the daemon keeps this handle to
/// notice when the loaded track runs out.
#[derive(Debug, Clone, Default)]
pub struct EngineClock(Arc<Mutex<Clock>>);

impl EngineClock {
    fn lock(&self) -> MutexGuard<'_, Clock> {
        // A poisoned clock still holds a usable position
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Whether the loaded track played to its end
    pub fn finished(&self) -> bool {
        let clock = self.lock();
        clock.loaded.is_some()
            && clock.started_at.is_some()
            && clock.duration_ms > 0
            && clock.position() >= clock.duration_ms
    }

    pub fn position_ms(&self) -> u64 {
        self.lock().position()
    }

    pub fn volume(&self) -> f32 {
        self.lock().volume
    }

    pub fn is_running(&self) -> bool {
        self.lock().started_at.is_some()
    }

    /// Freeze the clock at its current position
    pub fn stop(&self) {
        self.lock().freeze();
    }
}

/// Engine that keeps time without decoding anything
#[derive(Debug, Default)]
pub struct SilentEngine {
    clock: EngineClock,
}

impl SilentEngine {
    pub fn new(clock: EngineClock) -> Self {
        Self { clock }
    }
}

impl AudioEngine for SilentEngine {
    fn prepare(&mut self, track: &PlayerTrack, bookmark_ms: u64) -> EngineResult<()> {
        debug!(track_id = track.entity.id, bookmark_ms, "Engine prepare");
        self.clock.lock().load(track, bookmark_ms)
    }

    fn play(&mut self, track: &PlayerTrack, has_focus: bool, from_track_end: bool) -> EngineResult<()> {
        debug!(track_id = track.entity.id, has_focus, from_track_end, "Engine play");
        let mut clock = self.clock.lock();
        clock.load(track, track.bookmark_ms)?;
        if has_focus {
            clock.run();
        }
        Ok(())
    }

    fn resume(&mut self) -> EngineResult<()> {
        let mut clock = self.clock.lock();
        if clock.loaded.is_none() {
            return Err(EngineError::new("no track loaded"));
        }
        clock.run();
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.clock.lock().freeze();
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> EngineResult<()> {
        let mut clock = self.clock.lock();
        if clock.loaded.is_none() {
            return Err(EngineError::new("no track loaded"));
        }
        let running = clock.started_at.is_some();
        clock.base_ms = position_ms.min(clock.duration_ms);
        clock.started_at = running.then(Instant::now);
        Ok(())
    }

    fn set_playback_speed(&mut self, speed: f32) {
        let mut clock = self.clock.lock();
        let running = clock.started_at.is_some();
        clock.freeze();
        clock.speed = speed;
        if running {
            clock.run();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.clock.lock().volume = volume;
    }

    fn bookmark_ms(&self) -> u64 {
        self.clock.lock().position()
    }

    fn duration_ms(&self) -> u64 {
        self.clock.lock().duration_ms
    }

    fn is_playing(&self) -> bool {
        self.clock.lock().started_at.is_some()
    }
}

/// Focus for a host without a competing-audio arbiter: always granted
#[derive(Debug, Default)]
pub struct LocalFocus {
    held: bool,
}

impl AudioFocus for LocalFocus {
    fn request_focus(&mut self) -> bool {
        if !self.held {
            debug!("Audio focus acquired");
        }
        self.held = true;
        true
    }

    fn abandon_focus(&mut self) {
        if self.held {
            debug!("Audio focus released");
        }
        self.held = false;
    }
}

/// Output route watcher; the daemon has no route changes to report
#[derive(Debug, Default)]
pub struct LocalNoisyReceiver {
    registered: bool,
}

impl NoisyReceiver for LocalNoisyReceiver {
    fn register(&mut self) {
        self.registered = true;
    }

    fn unregister(&mut self) {
        self.registered = false;
    }
}

/// Keeps the process marked busy while audio is active
#[derive(Debug, Default)]
pub struct LocalHost {
    running: bool,
}

impl HostLifecycle for LocalHost {
    fn start(&mut self) {
        if !self.running {
            info!("Playback active");
        }
        self.running = true;
    }

    fn stop(&mut self) {
        if self.running {
            info!("Playback idle");
        }
        self.running = false;
    }
}

/// Collaborators for a headless session sharing `clock`
pub fn local_collaborators(clock: EngineClock) -> PlayerCollaborators {
    PlayerCollaborators {
        engine: Box::new(SilentEngine::new(clock)),
        focus: Box::new(LocalFocus::default()),
        noisy: Box::new(LocalNoisyReceiver::default()),
        host: Box::new(LocalHost::default()),
    }
}
