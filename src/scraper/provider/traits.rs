use crate::scraper::{
    Result,
    types::{EpisodeInfo, ExternalIds, MediaInfo, MediaType},
};
use async_trait::async_trait;

/// Search options for providers
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Year filter
    pub year: Option<i32>,
    /// Limit results
    pub limit: Option<usize>,
    /// Preferred language (e.g. "en-US")
    pub language: Option<String>,
    /// Media type filter
    pub media_type: Option<MediaType>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }
}

/// Capabilities a metadata source must offer to drive renaming
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider identifier (e.g., "tmdb")
    fn id(&self) -> &'static str;

    /// Human-readable provider name
    fn name(&self) -> &'static str;

    /// Whether this provider requires an API key
    fn requires_api_key(&self) -> bool {
        false
    }

    /// Check that the configured credentials are accepted
    async fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Search by title. An empty result is not an error.
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<MediaInfo>>;

    /// Get episode details
    async fn get_episode(&self, series_id: &str, season: i32, episode: i32) -> Result<EpisodeInfo>;

    /// Get IDs of the same title in other databases
    async fn external_ids(&self, _id: &str, _media_type: MediaType) -> Result<ExternalIds> {
        Ok(ExternalIds::default())
    }
}
