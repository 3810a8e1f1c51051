mod matcher;
mod parser;
mod provider;
mod resolver;
mod types;


pub use matcher::{Matcher, ScoredMatch};
pub use parser::{MediaCandidate, Parser, split_extension};
pub use provider::{
    HttpClient, HttpOptions, MetadataProvider, ProviderKind, SearchOptions, TmdbProvider,
};
pub use resolver::{Resolver, ResolverConfig};
pub use types::{EpisodeInfo, ExternalIds, MediaInfo, MediaType, MetadataRecord};

use std::sync::Arc;
use std::time::Duration;

/// Scraper result type
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Scraper error types
#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Authentication rejected by provider: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded. Retry after: {0:?}")]
    RateLimit(Option<Duration>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ScraperError {
    /// Whether a single retry may succeed (timeouts, connection failures,
    /// throttling and server-side errors)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::RateLimit(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the provider rejected the credentials
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Build the resolver for the configured provider
pub fn create_resolver(
    kind: ProviderKind,
    api_key: &str,
    base_url: Option<&str>,
    http: &HttpOptions,
    config: ResolverConfig,
) -> Result<Resolver> {
    let provider: Arc<dyn MetadataProvider> = match kind {
        ProviderKind::Tmdb => match base_url {
            Some(url) => Arc::new(TmdbProvider::with_base_url(url, api_key, http)?),
            None => Arc::new(TmdbProvider::new(api_key, http)?),
        },
    };

    Ok(Resolver::new(provider, config))
}
