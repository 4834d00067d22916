/// Daemon configuration
use crate::error::{DaemonError, Result};
use cadence_playback::PlaybackConfig;
use cadence_storage::LibraryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DaemonConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default = "default_player")]
    pub player: PlayerSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerSettings {
    /// Length given to queued tracks that do not name one
    #[serde(default = "default_track_seconds")]
    pub default_track_seconds: u64,

    /// How often the engine clock is polled for track end
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// `prev` restarts the current track when past this position
    #[serde(default = "default_restart_threshold_ms")]
    pub restart_threshold_ms: u64,
}

impl DaemonConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables use the `CADENCE_` prefix and `__` between
    /// nesting levels, e.g. `CADENCE_STORAGE__DATABASE_URL`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = path.unwrap_or_else(|| Path::new("cadence.toml"));
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        } else if path.is_some() {
            return Err(DaemonError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| DaemonError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| DaemonError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.is_empty() {
            return Err(DaemonError::Config(
                "Database URL is required (set CADENCE_STORAGE__DATABASE_URL)".to_string(),
            ));
        }

        let speed = self.playback.default_speed;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(DaemonError::Config(format!(
                "Default speed must be positive, got {speed}"
            )));
        }

        if self.library.last_played_limit == 0 {
            return Err(DaemonError::Config(
                "last_played_limit must be at least 1".to_string(),
            ));
        }

        if self.player.tick_ms == 0 {
            return Err(DaemonError::Config("tick_ms must be at least 1".to_string()));
        }

        Ok(())
    }
}

// Default values
fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/cadence.db".to_string()
}

fn default_player() -> PlayerSettings {
    PlayerSettings {
        default_track_seconds: default_track_seconds(),
        tick_ms: default_tick_ms(),
        restart_threshold_ms: default_restart_threshold_ms(),
    }
}

fn default_track_seconds() -> u64 {
    180
}

fn default_tick_ms() -> u64 {
    250
}

fn default_restart_threshold_ms() -> u64 {
    3_000
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            library: LibraryConfig::default(),
            playback: PlaybackConfig::default(),
            player: default_player(),
        }
    }
}
