use regex::Regex;
use std::sync::LazyLock;

/// Pre-compiled regex patterns for filename parsing.
///
/// Token patterns are anchored: they are matched against single tokens after
/// the filename has been split on separators.
pub struct Patterns {
    // Cleanup patterns applied to the whole stem
    pub bracket_group: Regex,  // [Group], {hash}
    pub year_in_parens: Regex, // (1999)
    pub paren_group: Regex,    // (1080p), (Director's Cut)
    pub separators: Regex,

    // Episode patterns (token level, ordered by specificity)
    pub season_episode: Regex,   // S01E01, s1e1, S01E01E02
    pub season_x_episode: Regex, // 1x01
    pub season_only: Regex,      // S01 (followed by an E01 token)
    pub episode_only: Regex,     // E01, EP01

    // Year token: 1900-2099
    pub year: Regex,

    // Release noise denylist
    pub noise: Regex,

    // Directory names that carry no title
    pub season_folder: Regex,
}

impl Patterns {
    pub fn new() -> Self {
        Self {
            bracket_group: Regex::new(r"\[[^\]]*\]|\{[^}]*\}").expect("Invalid bracket_group regex"),
            year_in_parens: Regex::new(r"\(((?:19|20)\d{2})\)").expect("Invalid year_in_parens regex"),
            paren_group: Regex::new(r"\([^)]*\)").expect("Invalid paren_group regex"),
            separators: Regex::new(r"[\s._\-]+").expect("Invalid separators regex"),

            season_episode: Regex::new(r"(?i)^s(\d{1,2})e(\d{1,3})(?:e\d{1,3})*$")
                .expect("Invalid season_episode regex"),
            season_x_episode: Regex::new(r"(?i)^(\d{1,2})x(\d{2,3})$")
                .expect("Invalid season_x_episode regex"),
            season_only: Regex::new(r"(?i)^s(\d{1,2})$").expect("Invalid season_only regex"),
            episode_only: Regex::new(r"(?i)^e(?:p)?(\d{1,3})$").expect("Invalid episode_only regex"),

            year: Regex::new(r"^(?:19|20)\d{2}$").expect("Invalid year regex"),

            noise: Regex::new(
                r"(?ix)^(?:
                    \d{3,4}[pi] | [48]k | uhd | hdr(?:10)? | sdr |
                    bluray | blu | bdrip | brrip | bdremux | remux | webrip | webdl | web |
                    hdtv | hdrip | dvdrip | dvdscr | dvd | hdcam | cam | telesync | screener |
                    x26[45] | h26[45] | hevc | avc | xvid | divx | av1 | vp9 | 10bit | 8bit |
                    aac\d* | ac3 | eac3 | dts | ddp?\d* | truehd | atmos | flac | mp3 | opus |
                    proper | repack | extended | unrated | remastered | internal | limited |
                    multi | subbed | dubbed | imax
                )$",
            )
            .expect("Invalid noise regex"),

            season_folder: Regex::new(r"(?i)^(?:(?:season|series|staffel|s)[\s._-]*\d{1,2}|specials)$")
                .expect("Invalid season_folder regex"),
        }
    }
}

impl Default for Patterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Global singleton for patterns
pub static PATTERNS: LazyLock<Patterns> = LazyLock::new(Patterns::new);
