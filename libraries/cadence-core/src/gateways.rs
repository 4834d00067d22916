//! Persistence gateways consumed by the playback core
//!
//! Each gateway covers one concern so that a host can back them with
//! different stores. The playback core treats every write as fail-soft.

use crate::error::Result;
use crate::types::{FavoriteRecord, FavoriteType, LastMetadata, MediaId, TrackId};
use async_trait::async_trait;
use std::sync::Arc;

/// Listening history
#[async_trait]
pub trait HistoryGateway: Send + Sync {
    /// Append a history row for the track
    async fn insert_history(&self, track_id: TrackId, is_podcast: bool) -> Result<()>;
}

/// Favorite lookup and reconciliation
#[async_trait]
pub trait FavoriteGateway: Send + Sync {
    /// Whether the item is currently in the user's favorites
    async fn is_favorite(&self, track_id: TrackId, kind: FavoriteType) -> Result<bool>;

    /// Publish the reconciled favorite status of the current item
    async fn update_favorite_state(&self, record: FavoriteRecord) -> Result<()>;
}

/// "Last played" artist and album records
#[async_trait]
pub trait LastPlayedGateway: Send + Sync {
    /// Record an artist (or podcast artist) context as last played
    async fn insert_last_played_artist(&self, media_id: &MediaId) -> Result<()>;

    /// Record an album (or podcast album) context as last played
    async fn insert_last_played_album(&self, media_id: &MediaId) -> Result<()>;
}

/// "Most played" counters
#[async_trait]
pub trait MostPlayedGateway: Send + Sync {
    /// Increment the counter for a playable leaf media id
    ///
    /// Contexts that do not keep statistics succeed without writing.
    async fn insert_most_played(&self, media_id: &MediaId) -> Result<()>;
}

/// Player preferences
#[async_trait]
pub trait PreferencesGateway: Send + Sync {
    /// Persist metadata of the last loaded track
    async fn set_last_metadata(&self, metadata: LastMetadata) -> Result<()>;

    /// Metadata saved by the last `set_last_metadata`, if any
    async fn last_metadata(&self) -> Result<Option<LastMetadata>>;

    /// Saved playback speed multiplier
    async fn playback_speed(&self) -> Result<Option<f32>>;

    /// Persist the playback speed multiplier
    async fn set_playback_speed(&self, speed: f32) -> Result<()>;
}

/// Bundle of every gateway a playback session needs
#[derive(Clone)]
pub struct Gateways {
    pub history: Arc<dyn HistoryGateway>,
    pub favorites: Arc<dyn FavoriteGateway>,
    pub last_played: Arc<dyn LastPlayedGateway>,
    pub most_played: Arc<dyn MostPlayedGateway>,
    pub preferences: Arc<dyn PreferencesGateway>,
}

impl Gateways {
    /// Use one store for every concern
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: HistoryGateway
            + FavoriteGateway
            + LastPlayedGateway
            + MostPlayedGateway
            + PreferencesGateway
            + 'static,
    {
        Self {
            history: store.clone(),
            favorites: store.clone(),
            last_played: store.clone(),
            most_played: store.clone(),
            preferences: store,
        }
    }
}

impl std::fmt::Debug for Gateways {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateways").finish_non_exhaustive()
    }
}
