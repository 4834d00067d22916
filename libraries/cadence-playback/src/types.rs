//! Core types for playback orchestration

use cadence_core::{MediaId, TrackId};
use serde::{Deserialize, Serialize};

/// Track information handed to the orchestrator
///
/// Resolved by the caller from the content index before any playback intent,
/// so the orchestrator never performs I/O to look up metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntity {
    /// Stable track identifier
    pub id: TrackId,

    /// Browsing context the track was started from
    pub media_id: MediaId,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    pub album: String,

    /// Track duration in milliseconds
    pub duration_ms: u64,

    /// Whether this is a podcast episode
    pub is_podcast: bool,
}

/// Where the track sits in the active queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePosition {
    /// Zero-based index of the track
    pub index: usize,

    /// Number of tracks in the queue
    pub len: usize,
}

impl QueuePosition {
    pub fn new(index: usize, len: usize) -> Self {
        Self { index, len }
    }

    /// Position of a single track played outside any queue
    pub fn single() -> Self {
        Self { index: 0, len: 1 }
    }
}

/// A track ready to be loaded into the audio engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTrack {
    pub entity: MediaEntity,

    /// Start position in milliseconds
    pub bookmark_ms: u64,

    pub position: QueuePosition,
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing loaded, or playback halted after an engine failure
    #[default]
    Idle,

    /// Track loaded into the engine, waiting for a play intent
    Preparing,

    /// Currently playing
    Playing,

    /// Paused mid-track (also the degraded state when focus is denied)
    Paused,
}

/// Direction recorded by `skip_to` until the next track is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipDirection {
    Previous,
    Next,
}

/// Why a new track is being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipType {
    /// Plain play intent, not a skip
    None,
    SkipPrevious,
    SkipNext,
    /// The previous track finished on its own
    TrackEnded,
}

impl SkipType {
    /// Skip direction, or `None` for a plain play intent
    pub fn direction(self) -> Option<SkipDirection> {
        match self {
            Self::None => None,
            Self::SkipPrevious => Some(SkipDirection::Previous),
            Self::SkipNext | Self::TrackEnded => Some(SkipDirection::Next),
        }
    }
}

/// Immutable view of "what is currently happening"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,

    /// Currently loaded track
    pub track_id: Option<TrackId>,

    /// Last known position in milliseconds, never past `duration_ms`
    pub bookmark_ms: u64,

    /// Duration of the loaded track in milliseconds (0 when unknown)
    pub duration_ms: u64,

    /// Positive speed multiplier
    pub speed: f32,

    /// Index of the current track within the active queue
    pub active_queue_slot: Option<usize>,

    pub can_skip_previous: bool,
    pub can_skip_next: bool,

    /// Skip recorded by `skip_to`, cleared when the next track is loaded
    pub pending_skip: Option<SkipDirection>,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            track_id: None,
            bookmark_ms: 0,
            duration_ms: 0,
            speed: 1.0,
            active_queue_slot: None,
            can_skip_previous: false,
            can_skip_next: false,
            pending_skip: None,
        }
    }
}

impl PlaybackSnapshot {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}

/// One row of the published queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub track_id: TrackId,
    pub title: String,
    pub artist: String,

    /// Unique, contiguous position within the queue
    pub position_in_queue: usize,
}

/// Request to replace the published queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueUpdate {
    /// Queue position of the active entry
    pub active_id: usize,

    pub queue: Vec<QueueEntry>,

    /// Dispatch without the debounce delay
    pub immediate: bool,
}

impl QueueUpdate {
    /// Entry the update marks as active, if it is part of the queue
    pub fn active_entry(&self) -> Option<&QueueEntry> {
        self.queue
            .iter()
            .find(|entry| entry.position_in_queue == self.active_id)
    }
}

/// Configuration for a playback session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Delay before dispatching a non-immediate queue update (default: 500)
    pub queue_debounce_ms: u64,

    /// Speed applied to the engine until changed (default: 1.0)
    pub default_speed: f32,

    /// Step used by forward/replay when the caller has no preference (default: 10)
    pub seek_step_seconds: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            queue_debounce_ms: 500,
            default_speed: 1.0,
            seek_step_seconds: 10,
        }
    }
}
