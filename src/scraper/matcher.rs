use crate::scraper::{
    parser::MediaCandidate,
    types::{MediaInfo, MediaType},
};
use std::cmp::Ordering;
use std::collections::HashSet;

/// A search result that passed the similarity threshold
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    /// The matched media info
    pub info: MediaInfo,
    /// Best title similarity over all known titles (0.0 - 1.0)
    pub similarity: f64,
    /// Normalized title equals the guessed title
    pub exact: bool,
    /// Distance to the guessed year, when both are known
    pub year_distance: Option<i32>,
    /// Position in the provider's result list
    pub rank: usize,
}

/// Matcher for filtering and ranking search results
pub struct Matcher;

impl Matcher {
    /// Score results against a candidate, drop those below `min_similarity`
    /// or of the wrong media type, and order the rest best first
    #[must_use]
    pub fn rank(
        results: Vec<MediaInfo>,
        candidate: &MediaCandidate,
        min_similarity: f64,
    ) -> Vec<ScoredMatch> {
        let expected = if candidate.is_series {
            MediaType::Tv
        } else {
            MediaType::Movie
        };
        let query = Self::normalize_title(&candidate.guessed_title);

        let mut scored: Vec<ScoredMatch> = results
            .into_iter()
            .enumerate()
            .filter(|(_, info)| info.media_type.is_compatible_with(expected))
            .map(|(rank, info)| {
                let (similarity, exact) = Self::score_title(&info.all_titles(), &query);
                let year_distance = info
                    .year
                    .zip(candidate.guessed_year)
                    .map(|(a, b)| (a - b).abs());
                ScoredMatch {
                    info,
                    similarity,
                    exact,
                    year_distance,
                    rank,
                }
            })
            .filter(|m| m.similarity >= min_similarity)
            .collect();

        scored.sort_by(Self::compare);
        scored
    }

    /// Get the best acceptable match, if any
    #[must_use]
    pub fn best_match(
        results: Vec<MediaInfo>,
        candidate: &MediaCandidate,
        min_similarity: f64,
    ) -> Option<ScoredMatch> {
        Self::rank(results, candidate, min_similarity)
            .into_iter()
            .next()
    }

    /// Exact title, then closest year, then similarity, then popularity,
    /// then vote count, then provider order
    fn compare(a: &ScoredMatch, b: &ScoredMatch) -> Ordering {
        b.exact
            .cmp(&a.exact)
            .then_with(|| match (a.year_distance, b.year_distance) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| b.similarity.total_cmp(&a.similarity))
            .then_with(|| {
                let pa = a.info.popularity.unwrap_or(0.0);
                let pb = b.info.popularity.unwrap_or(0.0);
                pb.total_cmp(&pa)
            })
            .then_with(|| b.info.vote_count.unwrap_or(0).cmp(&a.info.vote_count.unwrap_or(0)))
            .then_with(|| a.rank.cmp(&b.rank))
    }

    fn score_title(titles: &[&str], query: &str) -> (f64, bool) {
        let mut best = 0.0_f64;

        for title in titles {
            let title_normalized = Self::normalize_title(title);

            if title_normalized == query {
                return (1.0, true);
            }

            best = best.max(Self::string_similarity(&title_normalized, query));
        }

        (best, false)
    }

    /// Lowercase, drop apostrophes, turn other punctuation into spaces and
    /// collapse whitespace. `Spider-Man` and `spider man` compare equal.
    pub(crate) fn normalize_title(title: &str) -> String {
        title
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '\'' | '\u{2019}'))
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn string_similarity(a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        // Use Jaccard similarity on words
        let words_a: HashSet<&str> = a.split_whitespace().collect();
        let words_b: HashSet<&str> = b.split_whitespace().collect();

        let intersection = words_a.intersection(&words_b).count();
        let union = words_a.union(&words_b).count();

        if union == 0 {
            return 0.0;
        }

        let jaccard = intersection as f64 / union as f64;

        // Also check if one contains the other
        let contains_bonus = if a.contains(b) || b.contains(a) {
            0.2
        } else {
            0.0
        };

        (jaccard + contains_bonus).min(1.0)
    }
}
