mod http;
mod tmdb;
mod traits;

pub use http::{HttpClient, HttpOptions};
pub use tmdb::TmdbProvider;
pub use traits::{MetadataProvider, SearchOptions};

use serde::{Deserialize, Serialize};

/// Metadata sources that can be selected in the settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Tmdb,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tmdb => write!(f, "tmdb"),
        }
    }
}
