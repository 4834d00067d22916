mod favorite;
mod ids;
mod played;

pub use favorite::{FavoriteRecord, FavoriteState, FavoriteType};
pub use ids::{MediaId, MediaIdCategory, TrackId};
pub use played::{HistoryEntry, LastMetadata, LastPlayed, MostPlayedEntry};
