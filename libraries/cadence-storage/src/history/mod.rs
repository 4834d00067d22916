//! Listening history

use crate::error::Result;
use cadence_core::{HistoryEntry, TrackId};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Append a history row
pub async fn insert(
    pool: &SqlitePool,
    track_id: TrackId,
    is_podcast: bool,
    played_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("INSERT INTO play_history (track_id, is_podcast, played_at) VALUES (?, ?, ?)")
        .bind(track_id)
        .bind(is_podcast)
        .bind(played_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Most recent history rows, newest first
pub async fn recent(pool: &SqlitePool, is_podcast: bool, limit: u32) -> Result<Vec<HistoryEntry>> {
    let rows = sqlx::query(
        "SELECT track_id, is_podcast, played_at
         FROM play_history
         WHERE is_podcast = ?
         ORDER BY id DESC
         LIMIT ?",
    )
    .bind(is_podcast)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<HistoryEntry> {
            Ok(HistoryEntry {
                track_id: row.try_get("track_id")?,
                is_podcast: row.try_get("is_podcast")?,
                played_at: row.try_get("played_at")?,
            })
        })
        .collect()
}

/// Number of times a track appears in the history
pub async fn play_count(pool: &SqlitePool, track_id: TrackId) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM play_history WHERE track_id = ?")
        .bind(track_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
