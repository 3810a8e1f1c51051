use crate::scraper::{
    Result, ScraperError,
    matcher::{Matcher, ScoredMatch},
    parser::MediaCandidate,
    provider::{MetadataProvider, SearchOptions},
    types::{MediaType, MetadataRecord},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Minimum title similarity for a result to be accepted
    pub min_similarity: f64,
    /// Maximum number of results to consider from one search
    pub max_results: usize,
    /// Language for searches and returned titles
    pub language: Option<String>,
    /// Look up the IMDb id of every match
    pub fetch_imdb_id: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.5,
            max_results: 20,
            language: None,
            fetch_imdb_id: false,
        }
    }
}

/// Turns a candidate into an authoritative record using one provider
pub struct Resolver {
    provider: Arc<dyn MetadataProvider>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(provider: Arc<dyn MetadataProvider>, config: ResolverConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &dyn MetadataProvider {
        self.provider.as_ref()
    }

    /// Validate credentials once, before any per-file lookup
    pub async fn preflight(&self) -> Result<()> {
        if self.provider.requires_api_key() {
            info!(provider = self.provider.id(), "Validating provider credentials");
        }
        self.provider.validate().await
    }

    /// Look up a candidate. `Ok(None)` means nothing acceptable was found.
    pub async fn resolve(&self, candidate: &MediaCandidate) -> Result<Option<MetadataRecord>> {
        if candidate.guessed_title.trim().is_empty() {
            return Ok(None);
        }

        let media_type = if candidate.is_series {
            MediaType::Tv
        } else {
            MediaType::Movie
        };

        debug!(
            title = %candidate.guessed_title,
            year = ?candidate.guessed_year,
            media_type = %media_type,
            "Resolving"
        );

        let Some(best) = self.find(candidate, media_type).await? else {
            debug!(title = %candidate.guessed_title, "No acceptable match");
            return Ok(None);
        };

        debug!(
            matched = %best.info.title,
            id = %best.info.id,
            similarity = best.similarity,
            "Best match"
        );

        let record_type = match best.info.media_type {
            MediaType::Unknown => media_type,
            known => known,
        };
        let mut record = MetadataRecord::new(&best.info.title, &best.info.id, &best.info.provider)
            .with_year(best.info.year)
            .with_type(record_type);

        if candidate.is_series
            && let (Some(season), Some(episode)) = (candidate.season, candidate.episode)
        {
            match self.provider.get_episode(&best.info.id, season, episode).await {
                Ok(ep) => record = record.with_episode_title(ep.title),
                Err(ScraperError::NotFound(_)) => {
                    debug!(series = %best.info.title, season, episode, "Episode not found");
                }
                Err(e) => return Err(e),
            }
        }

        if self.config.fetch_imdb_id {
            match self.provider.external_ids(&best.info.id, record_type).await {
                Ok(ids) => record = record.with_imdb_id(ids.imdb),
                Err(e) => warn!(id = %best.info.id, error = %e, "Failed to fetch external ids"),
            }
        }

        Ok(Some(record))
    }

    /// Best match with the year filter, then without it. Release years are
    /// often off by one between regions, so unrelated year-filtered hits that
    /// all score too low also trigger the unfiltered search.
    async fn find(&self, candidate: &MediaCandidate, media_type: MediaType) -> Result<Option<ScoredMatch>> {
        let options = SearchOptions::new()
            .with_year(candidate.guessed_year)
            .with_type(media_type)
            .with_language(self.config.language.clone())
            .with_limit(self.config.max_results);

        let results = self.provider.search(&candidate.guessed_title, &options).await?;
        let best = Matcher::best_match(results, candidate, self.config.min_similarity);
        if best.is_some() || candidate.guessed_year.is_none() {
            return Ok(best);
        }

        debug!(title = %candidate.guessed_title, "No match with year, retrying without");
        let results = self
            .provider
            .search(&candidate.guessed_title, &options.with_year(None))
            .await?;
        Ok(Matcher::best_match(results, candidate, self.config.min_similarity))
    }
}
