/// Identifier types for Cadence entities
use crate::error::{CadenceError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Track identifier as assigned by the device content index
pub type TrackId = i64;

const CATEGORY_SEPARATOR: char = '/';
const LEAF_SEPARATOR: char = '|';

/// Browsing facet a media id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaIdCategory {
    Folders,
    Playlists,
    Songs,
    Albums,
    Artists,
    Genres,
    Podcasts,
    PodcastPlaylists,
    PodcastAlbums,
    PodcastArtists,
    /// Section headers in browsable lists, never playable
    Header,
}

impl MediaIdCategory {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folders => "FOLDERS",
            Self::Playlists => "PLAYLISTS",
            Self::Songs => "SONGS",
            Self::Albums => "ALBUMS",
            Self::Artists => "ARTISTS",
            Self::Genres => "GENRES",
            Self::Podcasts => "PODCASTS",
            Self::PodcastPlaylists => "PODCAST_PLAYLISTS",
            Self::PodcastAlbums => "PODCAST_ALBUMS",
            Self::PodcastArtists => "PODCAST_ARTISTS",
            Self::Header => "HEADER",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FOLDERS" => Some(Self::Folders),
            "PLAYLISTS" => Some(Self::Playlists),
            "SONGS" => Some(Self::Songs),
            "ALBUMS" => Some(Self::Albums),
            "ARTISTS" => Some(Self::Artists),
            "GENRES" => Some(Self::Genres),
            "PODCASTS" => Some(Self::Podcasts),
            "PODCAST_PLAYLISTS" => Some(Self::PodcastPlaylists),
            "PODCAST_ALBUMS" => Some(Self::PodcastAlbums),
            "PODCAST_ARTISTS" => Some(Self::PodcastArtists),
            "HEADER" => Some(Self::Header),
            _ => None,
        }
    }

    /// Whether this facet lists podcast episodes rather than music
    #[must_use]
    pub fn is_podcast(&self) -> bool {
        matches!(
            self,
            Self::Podcasts | Self::PodcastPlaylists | Self::PodcastAlbums | Self::PodcastArtists
        )
    }
}

impl fmt::Display for MediaIdCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies the browsing context a track was started from
///
/// A media id without a leaf names a collection (an album, a genre, a
/// folder path). With a leaf it names one playable track inside that
/// collection. The text form is `CATEGORY/value` or `CATEGORY/value|leaf`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaId {
    category: MediaIdCategory,
    category_value: String,
    leaf: Option<TrackId>,
}

impl MediaId {
    /// Create a collection id
    pub fn new(category: MediaIdCategory, category_value: impl Into<String>) -> Self {
        Self {
            category,
            category_value: category_value.into(),
            leaf: None,
        }
    }

    /// Id for a single song outside of any collection
    pub fn song(track_id: TrackId) -> Self {
        Self {
            category: MediaIdCategory::Songs,
            category_value: String::new(),
            leaf: Some(track_id),
        }
    }

    /// Build the playable leaf for `track_id` inside `parent`
    ///
    /// # Errors
    /// Fails when `parent` is a header or carries no category value, since
    /// neither can contain playable items.
    pub fn playable_item(parent: &MediaId, track_id: TrackId) -> Result<Self> {
        if parent.category == MediaIdCategory::Header {
            return Err(CadenceError::invalid_media_id(format!(
                "{parent} is a header, not a playable collection"
            )));
        }
        if parent.category_value.is_empty() {
            return Err(CadenceError::invalid_media_id(format!(
                "{parent} has no category value"
            )));
        }
        Ok(Self {
            category: parent.category,
            category_value: parent.category_value.clone(),
            leaf: Some(track_id),
        })
    }

    pub fn category(&self) -> MediaIdCategory {
        self.category
    }

    pub fn category_value(&self) -> &str {
        &self.category_value
    }

    pub fn leaf(&self) -> Option<TrackId> {
        self.leaf
    }

    /// Collection id with the leaf stripped
    #[must_use]
    pub fn parent(&self) -> Self {
        Self {
            category: self.category,
            category_value: self.category_value.clone(),
            leaf: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    pub fn is_artist(&self) -> bool {
        self.category == MediaIdCategory::Artists
    }

    pub fn is_podcast_artist(&self) -> bool {
        self.category == MediaIdCategory::PodcastArtists
    }

    pub fn is_album(&self) -> bool {
        self.category == MediaIdCategory::Albums
    }

    pub fn is_podcast_album(&self) -> bool {
        self.category == MediaIdCategory::PodcastAlbums
    }

    pub fn is_podcast(&self) -> bool {
        self.category.is_podcast()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.category, CATEGORY_SEPARATOR, self.category_value)?;
        if let Some(leaf) = self.leaf {
            write!(f, "{LEAF_SEPARATOR}{leaf}")?;
        }
        Ok(())
    }
}

impl FromStr for MediaId {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        let (category, rest) = s
            .split_once(CATEGORY_SEPARATOR)
            .ok_or_else(|| CadenceError::invalid_media_id(s))?;
        let category = MediaIdCategory::from_str(category)
            .ok_or_else(|| CadenceError::invalid_media_id(format!("unknown category in {s}")))?;

        let (category_value, leaf) = match rest.rsplit_once(LEAF_SEPARATOR) {
            Some((value, leaf)) => {
                let leaf = leaf
                    .parse::<TrackId>()
                    .map_err(|e| CadenceError::invalid_media_id(format!("{s}: {e}")))?;
                (value, Some(leaf))
            }
            None => (rest, None),
        };

        Ok(Self {
            category,
            category_value: category_value.to_string(),
            leaf,
        })
    }
}

impl Serialize for MediaId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MediaId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
