/// Favorite types
use super::ids::TrackId;
use serde::{Deserialize, Serialize};

/// Kind of item a favorite refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteType {
    Track,
    Podcast,
}

impl FavoriteType {
    /// Favorite kind for an item, given whether it is a podcast episode
    #[must_use]
    pub fn for_item(is_podcast: bool) -> Self {
        if is_podcast {
            Self::Podcast
        } else {
            Self::Track
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Podcast => "podcast",
        }
    }
}

/// Favorite status of the current item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteState {
    Favorite,
    NotFavorite,
}

impl From<bool> for FavoriteState {
    fn from(is_favorite: bool) -> Self {
        if is_favorite {
            Self::Favorite
        } else {
            Self::NotFavorite
        }
    }
}

/// Reconciled favorite status for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub track_id: TrackId,
    pub state: FavoriteState,
    pub kind: FavoriteType,
}
