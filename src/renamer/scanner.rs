use crate::scraper::{Result, ScraperError, split_extension};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Default video file extensions
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts", "m2ts",
];

/// Default extensions of companion files renamed along with their video
pub const SIDECAR_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "sub", "idx", "vtt", "sup", "nfo"];

/// Filters applied while walking
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lowercase extensions to accept. Empty accepts every file.
    pub extensions: Vec<String>,
    /// Follow symbolic links (cycles are detected and skipped)
    pub follow_symlinks: bool,
    /// Descend into and report hidden entries
    pub include_hidden: bool,
    /// Lowercase extensions of companion files (subtitles, .nfo)
    pub sidecar_extensions: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: VIDEO_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            follow_symlinks: true,
            include_hidden: false,
            sidecar_extensions: SIDECAR_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

impl ScanOptions {
    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
    }

    fn is_sidecar(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| self.sidecar_extensions.iter().any(|allowed| *allowed == ext))
    }
}

/// Scanner for finding media files
pub struct Scanner<'a> {
    options: &'a ScanOptions,
}

impl<'a> Scanner<'a> {
    pub fn new(options: &'a ScanOptions) -> Self {
        Self { options }
    }

    /// Walk `root` recursively and return matching files in a stable order
    /// (sorted by file name at each level). Unreadable entries and symlink
    /// cycles are logged and skipped. A file reachable through several links
    /// is returned once.
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(ScraperError::Config(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let include_hidden = self.options.include_hidden;
        let walker = WalkDir::new(root)
            .follow_links(self.options.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| include_hidden || e.depth() == 0 || !is_hidden(e));

        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    match e.loop_ancestor() {
                        Some(ancestor) => warn!(
                            path = ?e.path(),
                            ancestor = %ancestor.display(),
                            "Symlink cycle skipped"
                        ),
                        None => warn!(error = %e, "Skipping unreadable entry"),
                    }
                    continue;
                }
            };

            // Without follow_links a symlink reports its own type and is skipped
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.options.accepts(path) {
                continue;
            }

            let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            if !seen.insert(key) {
                debug!(path = %path.display(), "Already discovered through another link");
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    /// Companion files next to each of `videos`, in the same order.
    ///
    /// A companion sits in the video's folder and its name is the video's
    /// stem followed by a dot (`Heat.1995.en.srt` for `Heat.1995.mkv`). When
    /// several videos match, the one with the longest stem wins.
    pub fn sidecars(&self, videos: &[PathBuf]) -> Vec<Vec<PathBuf>> {
        let mut found = vec![Vec::new(); videos.len()];
        if self.options.sidecar_extensions.is_empty() {
            return found;
        }

        let known: HashSet<&Path> = videos.iter().map(PathBuf::as_path).collect();
        let mut by_dir: BTreeMap<&Path, Vec<usize>> = BTreeMap::new();
        for (i, video) in videos.iter().enumerate() {
            if let Some(dir) = video.parent() {
                by_dir.entry(dir).or_default().push(i);
            }
        }

        for (dir, indices) in by_dir {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Cannot list folder for companion files");
                    continue;
                }
            };

            let mut paths: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && self.options.is_sidecar(path))
                .filter(|path| !known.contains(path.as_path()))
                .collect();
            paths.sort();

            for path in paths {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if !self.options.include_hidden && name.starts_with('.') {
                    continue;
                }

                let owner = indices
                    .iter()
                    .filter_map(|&i| {
                        let stem = video_stem(&videos[i])?;
                        let rest = name.strip_prefix(stem)?;
                        rest.starts_with('.').then_some((stem.len(), i))
                    })
                    .max_by_key(|&(len, _)| len);

                if let Some((_, i)) = owner {
                    debug!(video = %videos[i].display(), sidecar = %path.display(), "Companion file");
                    found[i].push(path);
                }
            }
        }

        found
    }
}

fn video_stem(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    Some(split_extension(name).0)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
