use super::patterns::{PATTERNS, Patterns};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

/// Latest year accepted as a release year (next calendar year).
static MAX_YEAR: LazyLock<i32> = LazyLock::new(|| chrono::Local::now().year() + 1);

/// A tentative identification of a media file, built from its name alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCandidate {
    /// Filename as given, extension included
    pub raw_filename: String,
    /// Cleaned title for searching
    pub guessed_title: String,
    /// Release year if found
    pub guessed_year: Option<i32>,
    /// Season number
    pub season: Option<i32>,
    /// Episode number
    pub episode: Option<i32>,
    /// Whether a season/episode marker was found
    pub is_series: bool,
    /// Episode title guessed from the text following the episode marker
    pub episode_hint: Option<String>,
}

impl MediaCandidate {
    fn fallback(raw_filename: &str, title: String) -> Self {
        Self {
            raw_filename: raw_filename.to_string(),
            guessed_title: title,
            guessed_year: None,
            season: None,
            episode: None,
            is_series: false,
            episode_hint: None,
        }
    }
}

/// Position and numbers of a season/episode marker within the token list
#[derive(Debug, Clone, Copy)]
struct Marker {
    index: usize,
    len: usize,
    season: i32,
    episode: i32,
}

/// Result of analysing one name, before any fallback is applied
struct Analysis {
    tokens: Vec<String>,
    title: Option<String>,
    year: Option<i32>,
    marker: Option<Marker>,
    episode_hint: Option<String>,
}

pub struct Parser;

impl Parser {
    /// Parse a file path. Uses the parent directory name when the filename
    /// itself carries no usable title (e.g. `Show/Season 1/S01E01.mkv`).
    #[must_use]
    pub fn parse(path: &Path) -> MediaCandidate {
        Self::parse_path(path, None)
    }

    /// Like [`Parser::parse`], but only folders strictly below `root` are
    /// considered for the title fallback.
    #[must_use]
    pub fn parse_within(path: &Path, root: &Path) -> MediaCandidate {
        Self::parse_path(path, Some(root))
    }

    fn parse_path(path: &Path, root: Option<&Path>) -> MediaCandidate {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (stem, _) = split_extension(&filename);
        let analysis = Self::analyze(stem, &PATTERNS);
        if analysis.title.is_some() {
            return Self::build(&filename, stem, analysis);
        }

        let parent_title = path
            .ancestors()
            .skip(1)
            .take_while(|p| root.is_none_or(|r| *p != r && p.starts_with(r)))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy())
            .find(|n| !PATTERNS.season_folder.is_match(n.trim()))
            .map(|dir| Self::analyze(&dir, &PATTERNS));

        let mut candidate = Self::build(&filename, stem, analysis);
        if let Some(dir) = parent_title
            && let Some(title) = dir.title
        {
            candidate.guessed_title = title;
            if candidate.guessed_year.is_none() {
                candidate.guessed_year = dir.year;
            }
        }
        candidate
    }

    /// Parse a bare filename (extension included). Never fails: on total
    /// ambiguity the cleaned stem becomes the title.
    #[must_use]
    pub fn parse_filename(filename: &str) -> MediaCandidate {
        let (stem, _) = split_extension(filename);
        let analysis = Self::analyze(stem, &PATTERNS);
        Self::build(filename, stem, analysis)
    }

    fn build(filename: &str, stem: &str, analysis: Analysis) -> MediaCandidate {
        let title = analysis.title.clone().unwrap_or_else(|| {
            let cleaned = analysis.tokens.join(" ");
            if cleaned.is_empty() { stem.trim().to_string() } else { cleaned }
        });

        if analysis.year.is_none() && analysis.marker.is_none() && analysis.title.is_none() {
            return MediaCandidate::fallback(filename, title);
        }

        MediaCandidate {
            raw_filename: filename.to_string(),
            guessed_title: title,
            guessed_year: analysis.year,
            season: analysis.marker.map(|m| m.season),
            episode: analysis.marker.map(|m| m.episode),
            is_series: analysis.marker.is_some(),
            episode_hint: analysis.episode_hint,
        }
    }

    fn analyze(stem: &str, patterns: &Patterns) -> Analysis {
        let tokens = Self::tokenize(stem, patterns);
        let marker = Self::find_marker(&tokens, patterns);
        let year_index = Self::find_year(&tokens, patterns, marker);
        let year = year_index.and_then(|i| tokens[i].parse().ok());

        let title_end = match (year_index, marker) {
            (Some(y), Some(m)) => y.min(m.index),
            (Some(y), None) => y,
            (None, Some(m)) => m.index,
            (None, None) => Self::first_noise(&tokens, 0, patterns).unwrap_or(tokens.len()),
        };

        let title = Some(tokens[..title_end].join(" ")).filter(|t| !t.is_empty());

        let episode_hint = marker.and_then(|m| {
            let start = m.index + m.len;
            let end = tokens[start..]
                .iter()
                .position(|t| patterns.noise.is_match(t) || Self::is_year(t, patterns))
                .map_or(tokens.len(), |p| start + p);
            Some(tokens[start..end].join(" ")).filter(|t| !t.is_empty())
        });

        Analysis {
            tokens,
            title,
            year,
            marker,
            episode_hint,
        }
    }

    /// Remove bracketed tags and split the stem on separators.
    fn tokenize(stem: &str, patterns: &Patterns) -> Vec<String> {
        let cleaned = patterns.bracket_group.replace_all(stem, " ");
        let cleaned = patterns.year_in_parens.replace_all(&cleaned, " $1 ");
        let cleaned = patterns.paren_group.replace_all(&cleaned, " ");

        patterns
            .separators
            .split(&cleaned)
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '!' && c != '&'))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn find_marker(tokens: &[String], patterns: &Patterns) -> Option<Marker> {
        let number = |s: &str| s.parse::<i32>().ok();

        for (i, token) in tokens.iter().enumerate() {
            // S01E01
            if let Some(caps) = patterns.season_episode.captures(token)
                && let (Some(season), Some(episode)) = (number(&caps[1]), number(&caps[2]))
            {
                return Some(Marker { index: i, len: 1, season, episode });
            }

            // 1x01
            if let Some(caps) = patterns.season_x_episode.captures(token)
                && let (Some(season), Some(episode)) = (number(&caps[1]), number(&caps[2]))
            {
                return Some(Marker { index: i, len: 1, season, episode });
            }

            // S01 E01
            if let Some(caps) = patterns.season_only.captures(token)
                && let Some(next) = tokens.get(i + 1)
                && let Some(ep) = patterns.episode_only.captures(next)
                && let (Some(season), Some(episode)) = (number(&caps[1]), number(&ep[1]))
            {
                return Some(Marker { index: i, len: 2, season, episode });
            }

            // Season 1 Episode 1
            if token.eq_ignore_ascii_case("season")
                && let Some(season) = tokens.get(i + 1).and_then(|t| number(t.as_str()))
                && tokens.get(i + 2).is_some_and(|t| t.eq_ignore_ascii_case("episode"))
                && let Some(episode) = tokens.get(i + 3).and_then(|t| number(t.as_str()))
            {
                return Some(Marker { index: i, len: 4, season, episode });
            }
        }

        None
    }

    /// Index of the release year. A year in first position is usually part of
    /// the title (`2001.A.Space.Odyssey.1968`), so a later year wins over it.
    fn find_year(tokens: &[String], patterns: &Patterns, marker: Option<Marker>) -> Option<usize> {
        let in_marker = |i: usize| marker.is_some_and(|m| i >= m.index && i < m.index + m.len);
        let mut years = tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| !in_marker(*i) && Self::is_year(t, patterns))
            .map(|(i, _)| i);

        let first = years.next()?;
        if first == 0
            && let Some(second) = years.next()
        {
            return Some(second);
        }
        Some(first)
    }

    fn is_year(token: &str, patterns: &Patterns) -> bool {
        patterns.year.is_match(token)
            && token
                .parse::<i32>()
                .is_ok_and(|y| (1900..=*MAX_YEAR).contains(&y))
    }

    fn first_noise(tokens: &[String], from: usize, patterns: &Patterns) -> Option<usize> {
        tokens[from..]
            .iter()
            .position(|t| patterns.noise.is_match(t))
            .map(|p| from + p)
    }
}

/// Split a filename into stem and extension. Only short alphanumeric suffixes
/// containing a letter count as extensions, so `The.Matrix.1999` keeps its
/// year.
#[must_use]
pub fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && ext.chars().any(|c| c.is_ascii_alphabetic()) =>
        {
            (stem, Some(ext))
        }
        _ => (filename, None),
    }
}
