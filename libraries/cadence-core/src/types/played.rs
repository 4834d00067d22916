/// Listening history and statistics types
use super::ids::{MediaId, TrackId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of listening history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub track_id: TrackId,
    pub is_podcast: bool,
    pub played_at: DateTime<Utc>,
}

/// Recently played artist or album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPlayed {
    /// Category value of the artist/album media id
    pub category_value: String,
    pub is_podcast: bool,
    pub played_at: DateTime<Utc>,
}

/// Play counter for a track inside a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MostPlayedEntry {
    /// Collection the track was played from
    pub context: MediaId,
    pub track_id: TrackId,
    pub play_count: i64,
}

/// Metadata of the last loaded track, restored after a crash or restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMetadata {
    pub title: String,
    pub artist: String,
    pub id: TrackId,
}
