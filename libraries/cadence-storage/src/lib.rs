//! Cadence Storage
//!
//! `SQLite` persistence for the playback pipeline: listening history,
//! favorites, "last played" artists and albums, "most played" counters and
//! player preferences.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: each feature module owns its own queries
//! - **Gateways**: [`SqliteLibrary`] implements every gateway trait from
//!   `cadence-core` on top of those slices
//! - **Embedded Migrations**: `sqlx::migrate!` compiles the schema files into the binary
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_storage::{LibraryConfig, SqliteLibrary};
//! use cadence_core::Gateways;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let library = Arc::new(SqliteLibrary::open("sqlite://cadence.db", LibraryConfig::default()).await?);
//! let gateways = Gateways::from_store(library);
//! # Ok(())
//! # }
//! ```

mod error;
mod library;

// Vertical slices
pub mod favorites;
pub mod history;
pub mod last_played;
pub mod most_played;
pub mod settings;

pub use error::{Result, StorageError};
pub use library::{LibraryConfig, SqliteLibrary};

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// Applied versions are recorded in `_sqlx_migrations`, so this is safe
/// to call on every start.
///
/// # Errors
///
/// Returns an error if a migration fails or an applied one was edited
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    debug!(count = MIGRATOR.iter().count(), "Migrations up to date");
    Ok(())
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `sqlite://cadence.db`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    debug!(database_url, "SQLite pool created");
    Ok(pool)
}
