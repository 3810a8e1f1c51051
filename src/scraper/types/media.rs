use serde::{Deserialize, Serialize};

/// Media type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Unknown,
    Movie,
    Tv,
}

impl MediaType {
    /// Check if this type is compatible with another
    pub fn is_compatible_with(&self, other: MediaType) -> bool {
        match (self, other) {
            (Self::Unknown, _) | (_, Self::Unknown) => true,
            (a, b) => *a == b,
        }
    }

    /// Path segment used by the provider for this type
    pub const fn endpoint(&self) -> &'static str {
        match self {
            Self::Tv => "tv",
            Self::Movie | Self::Unknown => "movie",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Movie => write!(f, "movie"),
            Self::Tv => write!(f, "tv"),
        }
    }
}

/// One search result from a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Provider-specific ID
    pub id: String,
    /// Primary title
    pub title: String,
    /// Original/native title
    pub original_title: Option<String>,
    /// Media type
    pub media_type: MediaType,
    /// Release year (first air year for series)
    pub year: Option<i32>,
    /// Provider name (e.g., "tmdb")
    pub provider: String,
    /// Provider-reported popularity
    pub popularity: Option<f64>,
    /// Provider-reported vote count
    pub vote_count: Option<i64>,
}

impl MediaInfo {
    /// Create a new MediaInfo with required fields
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            original_title: None,
            media_type: MediaType::Unknown,
            year: None,
            provider: provider.into(),
            popularity: None,
            vote_count: None,
        }
    }

    pub fn with_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_original_title(mut self, title: Option<String>) -> Self {
        self.original_title = title;
        self
    }

    pub fn with_popularity(mut self, popularity: Option<f64>) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn with_vote_count(mut self, vote_count: Option<i64>) -> Self {
        self.vote_count = vote_count;
        self
    }

    /// Titles to match against (primary, then original)
    pub fn all_titles(&self) -> Vec<&str> {
        let mut titles = vec![self.title.as_str()];
        if let Some(ref orig) = self.original_title {
            titles.push(orig.as_str());
        }
        titles
    }
}

/// Extract the year from a provider date such as `1999-03-31`.
pub fn year_from_date(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.split('-').next())
        .filter(|y| y.len() == 4)
        .and_then(|y| y.parse().ok())
}
