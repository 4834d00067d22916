use crate::error::Result as StorageResult;
use crate::last_played::LastPlayedKind;
use crate::{create_pool, favorites, history, last_played, most_played, run_migrations, settings};
use async_trait::async_trait;
use cadence_core::{
    FavoriteGateway, FavoriteRecord, FavoriteState, FavoriteType, HistoryGateway, LastMetadata,
    LastPlayedGateway, MediaId, MostPlayedGateway, PreferencesGateway, Result, TrackId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::watch;
use tracing::debug;

/// Storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Entries kept per "last played" list (default: 10)
    pub last_played_limit: u32,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            last_played_limit: 10,
        }
    }
}

/// Library store backed by `SQLite`
///
/// Implements every persistence gateway of the playback pipeline. The
/// reconciled favorite state of the current item is kept in memory and
/// published to subscribers (a heart icon, a widget).
#[derive(Debug)]
pub struct SqliteLibrary {
    pool: SqlitePool,
    config: LibraryConfig,
    favorite_state: watch::Sender<Option<FavoriteRecord>>,
}

impl SqliteLibrary {
    pub fn new(pool: SqlitePool, config: LibraryConfig) -> Self {
        let (favorite_state, _) = watch::channel(None);
        Self {
            pool,
            config,
            favorite_state,
        }
    }

    /// Connect, run migrations, and wrap the pool
    pub async fn open(database_url: &str, config: LibraryConfig) -> StorageResult<Self> {
        let pool = create_pool(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool, config))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Favorite state of the current item, as last reconciled
    pub fn favorite_state(&self) -> Option<FavoriteRecord> {
        self.favorite_state.borrow().clone()
    }

    pub fn subscribe_favorite_state(&self) -> watch::Receiver<Option<FavoriteRecord>> {
        self.favorite_state.subscribe()
    }

    /// Flip an item's favorite status
    ///
    /// Returns the new status. When the item is the one currently shown,
    /// its published state follows.
    pub async fn toggle_favorite(&self, track_id: TrackId, kind: FavoriteType) -> Result<bool> {
        let now_favorite = if favorites::contains(&self.pool, track_id, kind).await? {
            favorites::remove(&self.pool, track_id, kind).await?;
            false
        } else {
            favorites::add(&self.pool, track_id, kind).await?;
            true
        };

        self.favorite_state.send_if_modified(|current| match current {
            Some(record) if record.track_id == track_id && record.kind == kind => {
                record.state = FavoriteState::from(now_favorite);
                true
            }
            _ => false,
        });
        Ok(now_favorite)
    }
}

#[async_trait]
impl HistoryGateway for SqliteLibrary {
    async fn insert_history(&self, track_id: TrackId, is_podcast: bool) -> Result<()> {
        history::insert(&self.pool, track_id, is_podcast, Utc::now()).await?;
        Ok(())
    }
}

#[async_trait]
impl FavoriteGateway for SqliteLibrary {
    async fn is_favorite(&self, track_id: TrackId, kind: FavoriteType) -> Result<bool> {
        Ok(favorites::contains(&self.pool, track_id, kind).await?)
    }

    async fn update_favorite_state(&self, record: FavoriteRecord) -> Result<()> {
        debug!(track_id = record.track_id, state = ?record.state, "Favorite state updated");
        self.favorite_state.send_replace(Some(record));
        Ok(())
    }
}

#[async_trait]
impl LastPlayedGateway for SqliteLibrary {
    async fn insert_last_played_artist(&self, media_id: &MediaId) -> Result<()> {
        last_played::insert(
            &self.pool,
            LastPlayedKind::Artist,
            media_id,
            self.config.last_played_limit,
        )
        .await?;
        Ok(())
    }

    async fn insert_last_played_album(&self, media_id: &MediaId) -> Result<()> {
        last_played::insert(
            &self.pool,
            LastPlayedKind::Album,
            media_id,
            self.config.last_played_limit,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MostPlayedGateway for SqliteLibrary {
    async fn insert_most_played(&self, media_id: &MediaId) -> Result<()> {
        if !most_played::insert(&self.pool, media_id).await? {
            debug!(%media_id, "Context keeps no play counts");
        }
        Ok(())
    }
}

#[async_trait]
impl PreferencesGateway for SqliteLibrary {
    async fn set_last_metadata(&self, metadata: LastMetadata) -> Result<()> {
        settings::set_last_metadata(&self.pool, &metadata).await?;
        Ok(())
    }

    async fn last_metadata(&self) -> Result<Option<LastMetadata>> {
        Ok(settings::last_metadata(&self.pool).await?)
    }

    async fn playback_speed(&self) -> Result<Option<f32>> {
        Ok(settings::playback_speed(&self.pool).await?)
    }

    async fn set_playback_speed(&self, speed: f32) -> Result<()> {
        settings::set_playback_speed(&self.pool, speed).await?;
        Ok(())
    }
}
