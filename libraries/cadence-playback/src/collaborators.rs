//! Platform collaborators the orchestrator drives
//!
//! The playback core never renders audio or talks to the OS itself. Hosts
//! implement these traits for their platform (a media service on a phone,
//! a silent clock-driven engine in the daemon, recording fakes in tests).

use crate::types::{PlayerTrack, QueueEntry};
use thiserror::Error;

/// Failure reported by an audio engine
///
/// Terminal for the current track: the orchestrator halts playback and
/// surfaces it to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Platform audio engine
///
/// Implementors own decoding and output. Calls arrive from the single
/// orchestrator writer, never concurrently.
pub trait AudioEngine: Send {
    /// Load a track and position it at `bookmark_ms` without starting output
    fn prepare(&mut self, track: &PlayerTrack, bookmark_ms: u64) -> EngineResult<()>;

    /// Load and start a track
    ///
    /// # Arguments
    /// * `has_focus` - Whether output may start; `false` loads the track paused
    /// * `from_track_end` - The previous track finished on its own (gapless hint)
    fn play(&mut self, track: &PlayerTrack, has_focus: bool, from_track_end: bool)
        -> EngineResult<()>;

    /// Resume the loaded track
    fn resume(&mut self) -> EngineResult<()>;

    /// Pause output, keeping the track loaded
    fn pause(&mut self) -> EngineResult<()>;

    /// Move the play head
    fn seek_to(&mut self, position_ms: u64) -> EngineResult<()>;

    /// Speed multiplier, already validated as positive
    fn set_playback_speed(&mut self, speed: f32);

    /// Output volume in [0.0, 1.0]
    fn set_volume(&mut self, volume: f32);

    /// Current play head in milliseconds
    fn bookmark_ms(&self) -> u64;

    /// Duration of the loaded track in milliseconds (0 when unknown)
    fn duration_ms(&self) -> u64;

    fn is_playing(&self) -> bool;
}

/// Arbiter of the exclusive right to produce audio
pub trait AudioFocus: Send {
    /// Ask for focus; `false` means denied
    fn request_focus(&mut self) -> bool;

    fn abandon_focus(&mut self);
}

/// Notifier for unexpected output route changes (headphones unplugged)
pub trait NoisyReceiver: Send {
    fn register(&mut self);
    fn unregister(&mut self);
}

/// Lifecycle of the host process that keeps playback alive
/// (a foreground service, a daemon keep-alive)
pub trait HostLifecycle: Send {
    fn start(&mut self);
    fn stop(&mut self);
}

/// Failure reported by a queue publisher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("queue publication failed: {0}")]
pub struct PublishError(pub String);

/// Session metadata consumer that receives the current queue
pub trait QueuePublisher: Send + Sync {
    fn publish_queue(&self, queue: &[QueueEntry]) -> std::result::Result<(), PublishError>;
}

/// Observer told that a new queue has been published
pub trait QueueWatcher: Send + Sync {
    fn on_queue_changed(&self);
}

/// Platform handles owned by the orchestrator
pub struct PlayerCollaborators {
    pub engine: Box<dyn AudioEngine>,
    pub focus: Box<dyn AudioFocus>,
    pub noisy: Box<dyn NoisyReceiver>,
    pub host: Box<dyn HostLifecycle>,
}

impl std::fmt::Debug for PlayerCollaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerCollaborators").finish_non_exhaustive()
    }
}
