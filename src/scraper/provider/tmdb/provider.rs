use super::api_types::{
    AuthenticationResponse, EpisodeDetails, ExternalIdsResponse, MovieResult, SearchResponse,
    TvResult,
};
use crate::scraper::{
    Result, ScraperError,
    provider::{HttpClient, HttpOptions, MetadataProvider, SearchOptions},
    types::{EpisodeInfo, ExternalIds, MediaInfo, MediaType, year_from_date},
};
use async_trait::async_trait;
use tracing::debug;

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

pub struct TmdbProvider {
    client: HttpClient,
    api_key: String,
}

impl TmdbProvider {
    pub fn new(api_key: impl Into<String>, options: &HttpOptions) -> Result<Self> {
        Self::with_base_url(TMDB_BASE_URL, api_key, options)
    }

    /// Point the provider at another host, e.g. a local mirror or test server
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: &HttpOptions,
    ) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(base_url, options)?,
            api_key: api_key.into(),
        })
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        extra_params: &[(&str, &str)],
    ) -> Result<T> {
        let mut params: Vec<(&str, &str)> = vec![("api_key", self.api_key.as_str())];
        params.extend_from_slice(extra_params);

        self.client.get_with_params(endpoint, &params).await
    }

    async fn search_movies(&self, query: &str, options: &SearchOptions) -> Result<Vec<MediaInfo>> {
        let mut params = vec![("query", query)];
        let year_str;
        if let Some(year) = options.year {
            year_str = year.to_string();
            params.push(("year", &year_str));
        }
        if let Some(ref language) = options.language {
            params.push(("language", language.as_str()));
        }

        let response: SearchResponse<MovieResult> =
            self.request("/search/movie", &params).await?;
        debug!(query = %query, total = response.total_results, "TMDB movie search");

        Ok(response
            .results
            .into_iter()
            .map(Self::movie_result_to_info)
            .collect())
    }

    async fn search_tv(&self, query: &str, options: &SearchOptions) -> Result<Vec<MediaInfo>> {
        let mut params = vec![("query", query)];
        let year_str;
        if let Some(year) = options.year {
            year_str = year.to_string();
            params.push(("first_air_date_year", &year_str));
        }
        if let Some(ref language) = options.language {
            params.push(("language", language.as_str()));
        }

        let response: SearchResponse<TvResult> = self.request("/search/tv", &params).await?;
        debug!(query = %query, total = response.total_results, "TMDB tv search");

        Ok(response
            .results
            .into_iter()
            .map(Self::tv_result_to_info)
            .collect())
    }

    fn movie_result_to_info(movie: MovieResult) -> MediaInfo {
        let year = year_from_date(movie.release_date.as_deref());

        MediaInfo::new(movie.id.to_string(), movie.title, "tmdb")
            .with_type(MediaType::Movie)
            .with_year(year)
            .with_original_title(movie.original_title)
            .with_popularity(movie.popularity)
            .with_vote_count(movie.vote_count)
    }

    fn tv_result_to_info(tv: TvResult) -> MediaInfo {
        let year = year_from_date(tv.first_air_date.as_deref());

        MediaInfo::new(tv.id.to_string(), tv.name, "tmdb")
            .with_type(MediaType::Tv)
            .with_year(year)
            .with_original_title(tv.original_name)
            .with_popularity(tv.popularity)
            .with_vote_count(tv.vote_count)
    }
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn id(&self) -> &'static str {
        "tmdb"
    }

    fn name(&self) -> &'static str {
        "The Movie Database"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn validate(&self) -> Result<()> {
        let auth: AuthenticationResponse = self.request("/authentication", &[]).await?;
        if auth.success {
            Ok(())
        } else {
            Err(ScraperError::Unauthorized(
                auth.status_message
                    .unwrap_or_else(|| "API key rejected".to_string()),
            ))
        }
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<MediaInfo>> {
        let mut results = match options.media_type {
            Some(MediaType::Movie) => self.search_movies(query, options).await?,
            Some(MediaType::Tv) => self.search_tv(query, options).await?,
            _ => {
                let mut results = self.search_movies(query, options).await?;
                results.extend(self.search_tv(query, options).await?);
                results
            }
        };

        if let Some(limit) = options.limit {
            results.truncate(limit);
        }

        Ok(results)
    }

    async fn get_episode(&self, series_id: &str, season: i32, episode: i32) -> Result<EpisodeInfo> {
        let endpoint = format!("/tv/{series_id}/season/{season}/episode/{episode}");
        let ep: EpisodeDetails = self.request(&endpoint, &[]).await?;

        Ok(EpisodeInfo {
            id: ep.id.to_string(),
            title: ep.name.filter(|n| !n.trim().is_empty()),
            season: ep.season_number,
            episode: ep.episode_number,
            air_date: ep.air_date,
            provider: "tmdb".to_string(),
        })
    }

    async fn external_ids(&self, id: &str, media_type: MediaType) -> Result<ExternalIds> {
        let endpoint = format!("/{}/{id}/external_ids", media_type.endpoint());
        let ids: ExternalIdsResponse = self.request(&endpoint, &[]).await?;

        Ok(ExternalIds {
            imdb: ids.imdb_id.filter(|i| !i.is_empty()),
            tvdb: ids.tvdb_id.map(|i| i.to_string()),
        })
    }
}
