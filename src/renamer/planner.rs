//! Rename planning - compute the target path of a file from its metadata

use crate::renamer::session::RenamePlan;
use crate::scraper::{MediaCandidate, MediaType, MetadataRecord, split_extension};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

pub const DEFAULT_MOVIE_TEMPLATE: &str = "{title} ({year})/{title} ({year}).{ext}";
pub const DEFAULT_SERIES_TEMPLATE: &str =
    "{title}/Season {season:02}/{title} - S{season:02}E{episode:02} - {episode_title}.{ext}";

/// Characters not allowed in filenames on various systems
const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Device names Windows refuses as file stems
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Fields that may be missing, together with the decoration removed with them
const OPTIONAL_FIELDS: &[&str] = &["year", "season", "episode", "episode_title", "imdb"];

static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)(?::(\d+))?\}").expect("Invalid field regex"));

static DECORATIONS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    OPTIONAL_FIELDS
        .iter()
        .map(|field| (*field, decoration(field)))
        .collect()
});

/// Matches an absent field with its wrapping: ` ({year})`, ` [imdbid-{imdb}]`,
/// ` - {episode_title}`, or the bare placeholder.
fn decoration(field: &str) -> Regex {
    let f = format!(r"\{{{field}(?::\d+)?\}}");
    Regex::new(&format!(
        r"\s*(?:\([^(){{}}/]*{f}[^(){{}}/]*\)|\[[^\[\]{{}}/]*{f}[^\[\]{{}}/]*\]|-\s*{f}|{f})"
    ))
    .expect("Invalid decoration regex")
}

/// Where the rendered path goes relative to the original file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Template folders replace the file's innermost parent folders below
    /// the root, as far as those folders hold nothing but this title. Shared
    /// folders (`Movies/`, `TV/`) are kept and the template folders are
    /// created inside them.
    #[default]
    Replace,
    /// Template folders are created inside the file's current folder
    Nest,
}

/// Naming templates for movies and episodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingTemplate {
    pub movie: String,
    pub series: String,
    pub placement: Placement,
}

impl Default for NamingTemplate {
    fn default() -> Self {
        Self {
            movie: DEFAULT_MOVIE_TEMPLATE.to_string(),
            series: DEFAULT_SERIES_TEMPLATE.to_string(),
            placement: Placement::default(),
        }
    }
}

enum Value {
    Text(String),
    Number(i32),
}

/// Identity of a matched title: provider, provider id and media type
type TitleKey = (String, String, MediaType);

fn title_key(record: &MetadataRecord) -> TitleKey {
    (
        record.provider.clone(),
        record.provider_id.clone(),
        record.media_type,
    )
}

/// Tracks, for every folder below the root, whether all media files in it
/// (recursively) resolved to one and the same title
#[derive(Debug, Clone)]
pub struct FolderOwners {
    root: PathBuf,
    owners: HashMap<PathBuf, Option<TitleKey>>,
}

impl FolderOwners {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            owners: HashMap::new(),
        }
    }

    /// Register a media file and what it resolved to. Unresolved and failed
    /// files pass `None`, which leaves their folders without an owner.
    pub fn claim(&mut self, file: &Path, record: Option<&MetadataRecord>) {
        let key = record.map(title_key);

        for dir in file.ancestors().skip(1) {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            self.owners
                .entry(dir.to_path_buf())
                .and_modify(|owner| {
                    if *owner != key {
                        *owner = None;
                    }
                })
                .or_insert_with(|| key.clone());
        }
    }

    /// Whether every media file below `dir` belongs to `record`'s title
    pub fn is_owned_by(&self, dir: &Path, record: &MetadataRecord) -> bool {
        self.owners
            .get(dir)
            .is_some_and(|owner| owner.as_ref() == Some(&title_key(record)))
    }
}

/// Computes rename plans for files below one scan root
#[derive(Debug, Clone)]
pub struct Planner {
    root: PathBuf,
    template: NamingTemplate,
    owners: FolderOwners,
}

impl Planner {
    pub fn new(root: impl Into<PathBuf>, template: NamingTemplate) -> Self {
        let root = root.into();
        Self {
            owners: FolderOwners::new(root.clone()),
            root,
            template,
        }
    }

    /// Folder ownership used by [`Placement::Replace`]. Without it no
    /// existing folder is replaced.
    pub fn with_owners(mut self, owners: FolderOwners) -> Self {
        self.owners = owners;
        self
    }

    /// Plan one file. Without a record the file keeps its path.
    pub fn plan(
        &self,
        original_path: PathBuf,
        candidate: MediaCandidate,
        record: Option<MetadataRecord>,
    ) -> RenamePlan {
        let proposed_path = record
            .as_ref()
            .and_then(|r| self.proposed_path(&original_path, &candidate, r))
            .unwrap_or_else(|| original_path.clone());

        RenamePlan::new(original_path, proposed_path, candidate, record)
    }

    fn proposed_path(
        &self,
        original: &Path,
        candidate: &MediaCandidate,
        record: &MetadataRecord,
    ) -> Option<PathBuf> {
        let filename = original.file_name()?.to_string_lossy();
        let (_, ext) = split_extension(&filename);
        let components = self.render(candidate, record, ext);
        if components.is_empty() {
            return None;
        }

        Some(self.place(original, &components, record))
    }

    /// Plan a companion file (subtitle, .nfo) of `video`. It follows the
    /// video into its new folder and keeps whatever comes after the video's
    /// stem, so `Heat.1995.en.srt` becomes `Heat (1995).en.srt`. Returns
    /// `None` when the video is not moving or the name does not match.
    pub fn plan_sidecar(&self, video: &RenamePlan, sidecar: PathBuf) -> Option<RenamePlan> {
        if !video.needs_rename() {
            return None;
        }

        let old_name = video.original_path.file_name()?.to_str()?;
        let new_name = video.proposed_path.file_name()?.to_str()?;
        let (old_stem, _) = split_extension(old_name);
        let (new_stem, _) = split_extension(new_name);

        let suffix = sidecar
            .file_name()?
            .to_str()?
            .strip_prefix(old_stem)?
            .to_string();
        if !suffix.starts_with('.') {
            return None;
        }

        let proposed_path = video.proposed_path.with_file_name(format!("{new_stem}{suffix}"));
        Some(RenamePlan::sidecar(sidecar, proposed_path, video))
    }

    /// Render the template into sanitized path components
    pub fn render(
        &self,
        candidate: &MediaCandidate,
        record: &MetadataRecord,
        ext: Option<&str>,
    ) -> Vec<String> {
        let episodic = record.media_type != MediaType::Movie
            && candidate.season.is_some()
            && candidate.episode.is_some();

        let (template, fields) = if episodic {
            let episode_title = record
                .episode_title
                .clone()
                .or_else(|| candidate.episode_hint.clone());
            (
                self.template.series.as_str(),
                vec![
                    ("title", Some(Value::Text(record.canonical_title.clone()))),
                    ("year", record.year.map(Value::Number)),
                    ("season", candidate.season.map(Value::Number)),
                    ("episode", candidate.episode.map(Value::Number)),
                    ("episode_title", episode_title.map(Value::Text)),
                    ("imdb", record.imdb_id.clone().map(Value::Text)),
                ],
            )
        } else {
            (
                self.template.movie.as_str(),
                vec![
                    ("title", Some(Value::Text(record.canonical_title.clone()))),
                    ("year", record.year.map(Value::Number)),
                    ("season", None),
                    ("episode", None),
                    ("episode_title", None),
                    ("imdb", record.imdb_id.clone().map(Value::Text)),
                ],
            )
        };

        let mut text = template.to_string();
        match ext {
            Some(_) if !text.contains("{ext}") => text.push_str(".{ext}"),
            Some(_) => {}
            None => text = text.replace(".{ext}", "").replace("{ext}", ""),
        }

        for (field, regex) in DECORATIONS.iter() {
            let absent = fields.iter().any(|(name, value)| name == field && value.is_none());
            if absent {
                text = regex.replace_all(&text, "").into_owned();
            }
        }

        let rendered = FIELD.replace_all(&text, |caps: &Captures| {
            let name = &caps[1];
            if name == "ext" {
                return ext.unwrap_or_default().to_string();
            }

            let width = caps
                .get(2)
                .and_then(|w| w.as_str().parse::<usize>().ok())
                .unwrap_or(0);

            match fields.iter().find(|(field, _)| *field == name) {
                Some((_, Some(Value::Text(text)))) => sanitize_value(text),
                Some((_, Some(Value::Number(n)))) => format!("{n:0width$}"),
                Some((_, None)) => String::new(),
                None => caps[0].to_string(),
            }
        });

        rendered
            .split('/')
            .map(sanitize_component)
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Attach rendered components to the original location
    fn place(&self, original: &Path, components: &[String], record: &MetadataRecord) -> PathBuf {
        let parent = original.parent().unwrap_or_else(|| Path::new(""));
        let folders = components.len() - 1;

        let base = match (self.template.placement, parent.strip_prefix(&self.root)) {
            (Placement::Replace, Ok(relative)) => {
                let dirs: Vec<Component> = relative.components().collect();

                // Only folders holding nothing but this title are replaced
                let mut replaced = 0;
                let mut dir = parent;
                while replaced < folders.min(dirs.len()) && self.owners.is_owned_by(dir, record) {
                    replaced += 1;
                    match dir.parent() {
                        Some(up) => dir = up,
                        None => break,
                    }
                }

                let mut base = self.root.clone();
                base.extend(&dirs[..dirs.len() - replaced]);
                base
            }
            _ => parent.to_path_buf(),
        };

        let mut path = base;
        path.extend(components);
        path
    }
}

/// Sanitize a field value so it cannot create folders or illegal names
fn sanitize_value(value: &str) -> String {
    let value = value.replace(": ", " - ");
    let result: String = value
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sanitize one path component
fn sanitize_component(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    // Collapse whitespace, then trim dots and spaces from both ends
    let mut result = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    result = result.trim_matches(|c| c == '.' || c == ' ').to_string();

    let stem = result.split('.').next().unwrap_or_default();
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        result.insert(stem.len(), '_');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renamer::session::PlanStatus;
    use crate::scraper::Parser;

    fn movie(title: &str, year: Option<i32>) -> MetadataRecord {
        MetadataRecord::new(title, "1", "test")
            .with_type(MediaType::Movie)
            .with_year(year)
    }

    fn series(title: &str, episode_title: Option<&str>) -> MetadataRecord {
        MetadataRecord::new(title, "2", "test")
            .with_type(MediaType::Tv)
            .with_episode_title(episode_title.map(str::to_string))
    }

    fn plan(planner: &Planner, path: &str, record: Option<MetadataRecord>) -> RenamePlan {
        let path = PathBuf::from(path);
        let candidate = Parser::parse(&path);
        planner.plan(path, candidate, record)
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("What?"), "What_");
        assert_eq!(sanitize_component("A\\B"), "A_B");
        assert_eq!(sanitize_component("  spaces  "), "spaces");
        assert_eq!(sanitize_component("Trailing..."), "Trailing");
        assert_eq!(sanitize_component("CON"), "CON_");
        assert_eq!(sanitize_component("aux.mkv"), "aux_.mkv");
        assert_eq!(sanitize_component("Console"), "Console");
    }

    #[test]
    fn test_sanitize_value() {
        assert_eq!(sanitize_value("Mission: Impossible"), "Mission - Impossible");
        assert_eq!(sanitize_value("AC/DC"), "AC_DC");
    }

    #[test]
    fn test_movie_example() {
        let planner = Planner::new("/library", NamingTemplate::default());
        let p = plan(
            &planner,
            "/library/The.Matrix.1999.1080p.BluRay.x264-GRP.mkv",
            Some(movie("The Matrix", Some(1999))),
        );

        assert_eq!(
            p.proposed_path,
            PathBuf::from("/library/The Matrix (1999)/The Matrix (1999).mkv")
        );
        assert_eq!(p.status, PlanStatus::Pending);
    }

    #[test]
    fn test_series_example() {
        let planner = Planner::new("/library", NamingTemplate::default());
        let p = plan(
            &planner,
            "/library/Show.Name.S02E05.Episode.Title.720p.mkv",
            Some(series("Show Name", None)),
        );

        assert_eq!(
            p.proposed_path,
            PathBuf::from("/library/Show Name/Season 02/Show Name - S02E05 - Episode Title.mkv")
        );
    }

    #[test]
    fn test_unresolved_keeps_path() {
        let planner = Planner::new("/library", NamingTemplate::default());
        let p = plan(&planner, "/library/randomfile.mkv", None);

        assert_eq!(p.candidate.guessed_title, "randomfile");
        assert!(p.is_noop());
        assert!(p.is_unresolved());
    }

    #[test]
    fn test_missing_year_removes_decoration() {
        let planner = Planner::new("/m", NamingTemplate::default());
        let p = plan(&planner, "/m/Heat.mkv", Some(movie("Heat", None)));

        assert_eq!(p.proposed_path, PathBuf::from("/m/Heat/Heat.mkv"));
    }

    #[test]
    fn test_missing_episode_title_removes_separator() {
        let planner = Planner::new("/tv", NamingTemplate::default());
        let p = plan(&planner, "/tv/Show.S01E02.mkv", Some(series("Show", None)));

        assert_eq!(
            p.proposed_path,
            PathBuf::from("/tv/Show/Season 01/Show - S01E02.mkv")
        );
    }

    #[test]
    fn test_provider_episode_title_wins_over_hint() {
        let planner = Planner::new("/tv", NamingTemplate::default());
        let p = plan(
            &planner,
            "/tv/Show.S01E02.wrong.guess.mkv",
            Some(series("Show", Some("The Real Title"))),
        );

        assert!(
            p.proposed_path
                .ends_with("Show - S01E02 - The Real Title.mkv")
        );
    }

    fn owners(root: &str, files: &[(&str, Option<&MetadataRecord>)]) -> FolderOwners {
        let mut owners = FolderOwners::new(root);
        for (path, record) in files {
            owners.claim(Path::new(path), *record);
        }
        owners
    }

    #[test]
    fn test_replace_placement_keeps_outer_folders() {
        let matrix = movie("The Matrix", Some(1999));
        let heat = MetadataRecord::new("Heat", "949", "test")
            .with_type(MediaType::Movie)
            .with_year(Some(1995));
        let planner = Planner::new("/media", NamingTemplate::default()).with_owners(owners(
            "/media",
            &[
                ("/media/Movies/the.matrix.1999/the.matrix.1999.mkv", Some(&matrix)),
                ("/media/Movies/heat.1995.mkv", Some(&heat)),
            ],
        ));
        let p = plan(
            &planner,
            "/media/Movies/the.matrix.1999/the.matrix.1999.mkv",
            Some(matrix.clone()),
        );

        assert_eq!(
            p.proposed_path,
            PathBuf::from("/media/Movies/The Matrix (1999)/The Matrix (1999).mkv")
        );
    }

    #[test]
    fn test_shared_folder_is_not_replaced() {
        let matrix = movie("The Matrix", Some(1999));
        let heat = MetadataRecord::new("Heat", "949", "test")
            .with_type(MediaType::Movie)
            .with_year(Some(1995));
        let planner = Planner::new("/media", NamingTemplate::default()).with_owners(owners(
            "/media",
            &[
                ("/media/Movies/The.Matrix.1999.mkv", Some(&matrix)),
                ("/media/Movies/Heat.1995.mkv", Some(&heat)),
            ],
        ));

        let p = plan(&planner, "/media/Movies/The.Matrix.1999.mkv", Some(matrix.clone()));
        assert_eq!(
            p.proposed_path,
            PathBuf::from("/media/Movies/The Matrix (1999)/The Matrix (1999).mkv")
        );

        let p = plan(&planner, "/media/Movies/Heat.1995.mkv", Some(heat.clone()));
        assert_eq!(
            p.proposed_path,
            PathBuf::from("/media/Movies/Heat (1995)/Heat (1995).mkv")
        );
    }

    #[test]
    fn test_unresolved_neighbour_keeps_folder() {
        let heat = movie("Heat", Some(1995));
        let planner = Planner::new("/media", NamingTemplate::default()).with_owners(owners(
            "/media",
            &[
                ("/media/inbox/Heat.1995.mkv", Some(&heat)),
                ("/media/inbox/home.video.mkv", None),
            ],
        ));
        let p = plan(&planner, "/media/inbox/Heat.1995.mkv", Some(heat.clone()));

        assert_eq!(
            p.proposed_path,
            PathBuf::from("/media/inbox/Heat (1995)/Heat (1995).mkv")
        );
    }

    #[test]
    fn test_series_folders_replaced_inside_shared_folder() {
        let show = series("Breaking Bad", None);
        let other = MetadataRecord::new("Other Show", "3", "test").with_type(MediaType::Tv);
        let planner = Planner::new("/media", NamingTemplate::default()).with_owners(owners(
            "/media",
            &[
                ("/media/TV/breaking bad/Season 1/Breaking.Bad.S01E01.mkv", Some(&show)),
                ("/media/TV/breaking bad/Season 1/Breaking.Bad.S01E02.mkv", Some(&show)),
                ("/media/TV/Other.Show.S01E01.mkv", Some(&other)),
            ],
        ));
        let p = plan(
            &planner,
            "/media/TV/breaking bad/Season 1/Breaking.Bad.S01E02.mkv",
            Some(show.clone()),
        );

        assert_eq!(
            p.proposed_path,
            PathBuf::from("/media/TV/Breaking Bad/Season 01/Breaking Bad - S01E02.mkv")
        );
    }

    #[test]
    fn test_without_owners_nothing_is_replaced() {
        let planner = Planner::new("/media", NamingTemplate::default());
        let p = plan(
            &planner,
            "/media/Movies/heat.1995.mkv",
            Some(movie("Heat", Some(1995))),
        );

        assert_eq!(
            p.proposed_path,
            PathBuf::from("/media/Movies/Heat (1995)/Heat (1995).mkv")
        );
    }

    #[test]
    fn test_sidecar_follows_video() {
        let planner = Planner::new("/m", NamingTemplate::default());
        let video = plan(&planner, "/m/Heat.1995.1080p.mkv", Some(movie("Heat", Some(1995))));

        let subtitle = planner
            .plan_sidecar(&video, PathBuf::from("/m/Heat.1995.1080p.en.forced.srt"))
            .unwrap();
        assert_eq!(
            subtitle.proposed_path,
            PathBuf::from("/m/Heat (1995)/Heat (1995).en.forced.srt")
        );
        assert_eq!(subtitle.sidecar_of.as_deref(), Some(Path::new("/m/Heat.1995.1080p.mkv")));
        assert_eq!(subtitle.record, video.record);

        let unresolved = plan(&planner, "/m/Heat.1995.1080p.mkv", None);
        assert!(
            planner
                .plan_sidecar(&unresolved, PathBuf::from("/m/Heat.1995.1080p.srt"))
                .is_none()
        );
    }

    #[test]
    fn test_file_only_template_preserves_depth() {
        let template = NamingTemplate {
            movie: "{title} ({year})".to_string(),
            ..Default::default()
        };
        let planner = Planner::new("/media", template);
        let p = plan(
            &planner,
            "/media/a/b/heat.1995.mkv",
            Some(movie("Heat", Some(1995))),
        );

        assert_eq!(p.proposed_path, PathBuf::from("/media/a/b/Heat (1995).mkv"));
    }

    #[test]
    fn test_nest_placement() {
        let template = NamingTemplate {
            placement: Placement::Nest,
            ..Default::default()
        };
        let planner = Planner::new("/media", template);
        let p = plan(
            &planner,
            "/media/inbox/heat.1995.mkv",
            Some(movie("Heat", Some(1995))),
        );

        assert_eq!(
            p.proposed_path,
            PathBuf::from("/media/inbox/Heat (1995)/Heat (1995).mkv")
        );
    }

    #[test]
    fn test_value_cannot_create_folders() {
        let planner = Planner::new("/m", NamingTemplate::default());
        let p = plan(&planner, "/m/acdc.2001.mkv", Some(movie("AC/DC: Live", Some(2001))));

        assert_eq!(
            p.proposed_path,
            PathBuf::from("/m/AC_DC - Live (2001)/AC_DC - Live (2001).mkv")
        );
    }

    #[test]
    fn test_imdb_field_and_ext_appended() {
        let template = NamingTemplate {
            movie: "{title} [imdbid-{imdb}]".to_string(),
            ..Default::default()
        };
        let planner = Planner::new("/m", template);

        let with_id = movie("Heat", Some(1995)).with_imdb_id(Some("tt0113277".to_string()));
        let p = plan(&planner, "/m/heat.1995.MKV", Some(with_id));
        assert_eq!(p.proposed_path, PathBuf::from("/m/Heat [imdbid-tt0113277].MKV"));

        let p = plan(&planner, "/m/heat.1995.MKV", Some(movie("Heat", Some(1995))));
        assert_eq!(p.proposed_path, PathBuf::from("/m/Heat.MKV"));
    }

    #[test]
    fn test_unpadded_fields() {
        let template = NamingTemplate {
            series: "{title} {season}x{episode:03}".to_string(),
            ..Default::default()
        };
        let planner = Planner::new("/tv", template);
        let p = plan(&planner, "/tv/Show.S01E02.mkv", Some(series("Show", None)));

        assert_eq!(p.proposed_path, PathBuf::from("/tv/Show 1x002.mkv"));
    }

    #[test]
    fn test_deterministic() {
        let planner = Planner::new("/tv", NamingTemplate::default());
        let a = plan(&planner, "/tv/Show.S01E02.mkv", Some(series("Show", Some("Pilot"))));
        let b = plan(&planner, "/tv/Show.S01E02.mkv", Some(series("Show", Some("Pilot"))));

        assert_eq!(a.proposed_path, b.proposed_path);
    }
}
