//! Recently played artist and album contexts
//!
//! Each (kind, podcast) list keeps only the most recent entries; inserting
//! a context that is already present moves it to the front.

use crate::error::Result;
use cadence_core::{LastPlayed, MediaId};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

/// Which list a context belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastPlayedKind {
    Artist,
    Album,
}

impl LastPlayedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
        }
    }
}

/// Record `context` as the most recently played entry of its list
///
/// The list is trimmed to `limit` entries in the same transaction.
pub async fn insert(
    pool: &SqlitePool,
    kind: LastPlayedKind,
    context: &MediaId,
    limit: u32,
) -> Result<()> {
    let is_podcast = context.is_podcast();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT OR REPLACE INTO last_played (kind, category_value, is_podcast, played_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(kind.as_str())
    .bind(context.category_value())
    .bind(is_podcast)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "DELETE FROM last_played
         WHERE kind = ? AND is_podcast = ? AND id NOT IN (
             SELECT id FROM last_played
             WHERE kind = ? AND is_podcast = ?
             ORDER BY id DESC
             LIMIT ?
         )",
    )
    .bind(kind.as_str())
    .bind(is_podcast)
    .bind(kind.as_str())
    .bind(is_podcast)
    .bind(limit)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Entries of one list, most recent first
pub async fn recent(
    pool: &SqlitePool,
    kind: LastPlayedKind,
    is_podcast: bool,
) -> Result<Vec<LastPlayed>> {
    let rows = sqlx::query(
        "SELECT category_value, is_podcast, played_at
         FROM last_played
         WHERE kind = ? AND is_podcast = ?
         ORDER BY id DESC",
    )
    .bind(kind.as_str())
    .bind(is_podcast)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<LastPlayed> {
            Ok(LastPlayed {
                category_value: row.try_get("category_value")?,
                is_podcast: row.try_get("is_podcast")?,
                played_at: row.try_get("played_at")?,
            })
        })
        .collect()
}
