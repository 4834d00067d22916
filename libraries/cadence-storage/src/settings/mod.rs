//! Player preferences
//!
//! Stored as key-value pairs with JSON-serialized values.

use crate::error::Result;
use cadence_core::LastMetadata;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;

/// Metadata of the last loaded track
pub const SETTING_LAST_METADATA: &str = "player.last_metadata";

/// Playback speed multiplier
pub const SETTING_PLAYBACK_SPEED: &str = "player.playback_speed";

/// Get a raw setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<serde_json::Value>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match value {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Set a raw setting value, replacing any previous one
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &serde_json::Value) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
         ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(serde_json::to_string(value)?)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Get a typed setting
pub async fn get<T: DeserializeOwned>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    match get_setting(pool, key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Set a typed setting
pub async fn set<T: Serialize>(pool: &SqlitePool, key: &str, value: &T) -> Result<()> {
    set_setting(pool, key, &serde_json::to_value(value)?).await
}

pub async fn last_metadata(pool: &SqlitePool) -> Result<Option<LastMetadata>> {
    get(pool, SETTING_LAST_METADATA).await
}

pub async fn set_last_metadata(pool: &SqlitePool, metadata: &LastMetadata) -> Result<()> {
    set(pool, SETTING_LAST_METADATA, metadata).await
}

pub async fn playback_speed(pool: &SqlitePool) -> Result<Option<f32>> {
    get(pool, SETTING_PLAYBACK_SPEED).await
}

pub async fn set_playback_speed(pool: &SqlitePool, speed: f32) -> Result<()> {
    set(pool, SETTING_PLAYBACK_SPEED, &speed).await
}

/// Remove a setting; returns whether it existed
pub async fn delete_setting(pool: &SqlitePool, key: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
