use super::MediaType;
use serde::{Deserialize, Serialize};

/// The confirmed identity of a file, as chosen from provider results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Title as spelled by the provider
    pub canonical_title: String,
    /// Release year (first air year for series)
    pub year: Option<i32>,
    /// Episode title, series only
    pub episode_title: Option<String>,
    /// Provider-specific ID of the movie or series
    pub provider_id: String,
    /// Provider name (e.g., "tmdb")
    pub provider: String,
    /// Media type of the matched entry
    pub media_type: MediaType,
    /// IMDb ID, when requested and known
    pub imdb_id: Option<String>,
}

impl MetadataRecord {
    pub fn new(
        canonical_title: impl Into<String>,
        provider_id: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            canonical_title: canonical_title.into(),
            year: None,
            episode_title: None,
            provider_id: provider_id.into(),
            provider: provider.into(),
            media_type: MediaType::Unknown,
            imdb_id: None,
        }
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    pub fn with_episode_title(mut self, title: Option<String>) -> Self {
        self.episode_title = title;
        self
    }

    pub fn with_imdb_id(mut self, imdb_id: Option<String>) -> Self {
        self.imdb_id = imdb_id;
        self
    }
}

/// Episode details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeInfo {
    /// Provider-specific episode ID
    pub id: String,
    /// Episode title
    pub title: Option<String>,
    /// Season number
    pub season: i32,
    /// Episode number
    pub episode: i32,
    /// Air date (YYYY-MM-DD)
    pub air_date: Option<String>,
    /// Provider name
    pub provider: String,
}

/// External IDs for cross-referencing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    pub imdb: Option<String>,
    pub tvdb: Option<String>,
}
