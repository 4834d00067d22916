//! Favorite tracks and podcast episodes

use crate::error::Result;
use cadence_core::{FavoriteType, TrackId};
use chrono::Utc;
use sqlx::SqlitePool;

/// Add an item to the favorites; adding twice is a no-op
pub async fn add(pool: &SqlitePool, track_id: TrackId, kind: FavoriteType) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO favorites (track_id, kind, added_at) VALUES (?, ?, ?)")
        .bind(track_id)
        .bind(kind.as_str())
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove an item from the favorites
///
/// Returns whether it was a favorite.
pub async fn remove(pool: &SqlitePool, track_id: TrackId, kind: FavoriteType) -> Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE track_id = ? AND kind = ?")
        .bind(track_id)
        .bind(kind.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn contains(pool: &SqlitePool, track_id: TrackId, kind: FavoriteType) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM favorites WHERE track_id = ? AND kind = ?")
            .bind(track_id)
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

/// Favorite ids of one kind, most recently added first
pub async fn list(pool: &SqlitePool, kind: FavoriteType) -> Result<Vec<TrackId>> {
    let ids = sqlx::query_scalar(
        "SELECT track_id FROM favorites WHERE kind = ? ORDER BY added_at DESC, track_id",
    )
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;
    Ok(ids)
}
