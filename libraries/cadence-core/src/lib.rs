//! Cadence Core
//!
//! Platform-agnostic identifiers, persisted entities, and persistence
//! gateway traits shared by the playback core and its storage backends.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Identifiers**: `TrackId` and `MediaId` (the browsing context a track was started from)
//! - **Entities**: history rows, favorite records, last played/most played statistics
//! - **Gateways**: async traits the playback pipeline writes through
//! - **Error Handling**: unified `CadenceError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use cadence_core::types::{MediaId, MediaIdCategory};
//!
//! let album = MediaId::new(MediaIdCategory::Albums, "42");
//! let track = MediaId::playable_item(&album, 7).unwrap();
//! assert_eq!(track.to_string(), "ALBUMS/42|7");
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod gateways;
pub mod types;

// Re-export commonly used types
pub use error::{CadenceError, Result};
pub use gateways::{
    FavoriteGateway, Gateways, HistoryGateway, LastPlayedGateway, MostPlayedGateway,
    PreferencesGateway,
};
pub use types::{
    FavoriteRecord, FavoriteState, FavoriteType, HistoryEntry, LastMetadata, LastPlayed, MediaId,
    MediaIdCategory, MostPlayedEntry, TrackId,
};
