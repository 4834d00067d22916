//! Play counters within folders, playlists and genres

use crate::error::{Result, StorageError};
use cadence_core::{MediaId, MediaIdCategory, MostPlayedEntry};
use sqlx::{Row, SqlitePool};

/// Whether plays started from this context are counted
pub fn tracks_context(context: &MediaId) -> bool {
    matches!(
        context.category(),
        MediaIdCategory::Folders | MediaIdCategory::Playlists | MediaIdCategory::Genres
    )
}

/// Count one play of the leaf track inside its context
///
/// Returns `false` without writing when the context keeps no statistics or
/// the id names no track.
pub async fn insert(pool: &SqlitePool, item: &MediaId) -> Result<bool> {
    let Some(track_id) = item.leaf() else {
        return Ok(false);
    };
    if !tracks_context(item) {
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO most_played (category, category_value, track_id, play_count)
         VALUES (?, ?, ?, 1)
         ON CONFLICT (category, category_value, track_id)
         DO UPDATE SET play_count = play_count + 1",
    )
    .bind(item.category().as_str())
    .bind(item.category_value())
    .bind(track_id)
    .execute(pool)
    .await?;
    Ok(true)
}

/// Most played tracks of a context, highest count first
pub async fn top(pool: &SqlitePool, context: &MediaId, limit: u32) -> Result<Vec<MostPlayedEntry>> {
    let parent = context.parent();
    let rows = sqlx::query(
        "SELECT track_id, play_count
         FROM most_played
         WHERE category = ? AND category_value = ?
         ORDER BY play_count DESC, track_id
         LIMIT ?",
    )
    .bind(parent.category().as_str())
    .bind(parent.category_value())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<MostPlayedEntry> {
            let track_id = row.try_get("track_id")?;
            let context = MediaId::playable_item(&parent, track_id).map_err(|_| {
                StorageError::Corrupt {
                    column: "category_value",
                    value: parent.to_string(),
                }
            })?;
            Ok(MostPlayedEntry {
                context,
                track_id,
                play_count: row.try_get("play_count")?,
            })
        })
        .collect()
}
