//! Playback events and listener fan-out
//!
//! The orchestrator notifies listeners synchronously, in registration
//! order, on the calling context. Listeners that need I/O hand the event
//! off to their own workers (see [`crate::EventPipeline`]).

use crate::collaborators::EngineError;
use crate::types::{MediaEntity, PlaybackSnapshot};
use cadence_core::{MediaId, TrackId};
use serde::{Deserialize, Serialize};

/// "Track became current" notification
///
/// Raised on prepare and on metadata change; the event pipeline consumes
/// each one exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEvent {
    pub track_id: TrackId,

    /// Browsing context the track was started from
    pub context: MediaId,

    pub title: String,
    pub artist: String,
    pub is_podcast: bool,
}

impl From<&MediaEntity> for PlaybackEvent {
    fn from(entity: &MediaEntity) -> Self {
        Self {
            track_id: entity.id,
            context: entity.media_id.clone(),
            title: entity.title.clone(),
            artist: entity.artist.clone(),
            is_podcast: entity.is_podcast,
        }
    }
}

/// Observer of orchestrator transitions
///
/// Every method has an empty default so listeners only implement what
/// they consume. Implementations must not block.
pub trait PlayerListener: Send + Sync {
    /// A track was loaded by `on_prepare`
    fn on_prepare(&self, _event: &PlaybackEvent) {}

    /// A transition produced a new snapshot
    fn on_state_changed(&self, _snapshot: &PlaybackSnapshot) {}

    /// A new track became current through play or skip
    fn on_metadata_changed(&self, _event: &PlaybackEvent) {}

    /// The play head moved to `position_ms`
    fn on_seek(&self, _position_ms: u64) {}

    /// The engine failed and playback of `track_id` stopped
    fn on_engine_failure(&self, _track_id: Option<TrackId>, _error: &EngineError) {}
}
