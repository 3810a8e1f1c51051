//! Layered settings: defaults, then the TOML settings file, then
//! `REELNAME__SECTION__KEY` environment variables.

use crate::renamer::{
    NamingTemplate, OrchestratorConfig, Placement, SIDECAR_EXTENSIONS, ScanOptions,
    VIDEO_EXTENSIONS,
};
use crate::scraper::{HttpOptions, ProviderKind, ResolverConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// File name looked up in the working directory
pub const LOCAL_SETTINGS_FILE: &str = "reelname.toml";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no configuration directory available on this system")]
    NoConfigDir,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub provider: ProviderSettings,
    #[validate(nested)]
    pub naming: NamingSettings,
    #[validate(nested)]
    pub matching: MatchingSettings,
    #[validate(nested)]
    pub scan: ScanSettings,
    #[validate(nested)]
    pub network: NetworkSettings,
    pub apply: ApplySettings,
    #[validate(nested)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProviderSettings {
    pub name: ProviderKind,
    /// Language for titles, e.g. "en-US"
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 16))]
    pub language: Option<String>,
    /// Alternative API endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_base_url"))]
    pub base_url: Option<String>,
    pub fetch_imdb_id: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NamingSettings {
    #[validate(custom(function = "validate_template"))]
    pub movie: String,
    #[validate(custom(function = "validate_template"))]
    pub series: String,
    pub placement: Placement,
}

impl Default for NamingSettings {
    fn default() -> Self {
        let template = NamingTemplate::default();
        Self {
            movie: template.movie,
            series: template.series,
            placement: template.placement,
        }
    }
}

impl NamingSettings {
    pub fn template(&self) -> NamingTemplate {
        NamingTemplate {
            movie: self.movie.clone(),
            series: self.series.clone(),
            placement: self.placement,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MatchingSettings {
    /// Lowest accepted title similarity
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_similarity: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self { min_similarity: 0.5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScanSettings {
    /// Extensions to pick up; an empty list accepts every file
    pub extensions: Vec<String>,
    pub follow_symlinks: bool,
    pub include_hidden: bool,
    /// Subtitle and .nfo extensions renamed along with their video; empty disables
    pub sidecar_extensions: Vec<String>,
    #[validate(range(min = 1, max = 64))]
    pub concurrency: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            extensions: VIDEO_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            follow_symlinks: true,
            include_hidden: false,
            sidecar_extensions: SIDECAR_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            concurrency: 4,
        }
    }
}

impl ScanSettings {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            extensions: normalize_extensions(&self.extensions),
            follow_symlinks: self.follow_symlinks,
            include_hidden: self.include_hidden,
            sidecar_extensions: normalize_extensions(&self.sidecar_extensions),
        }
    }
}

fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NetworkSettings {
    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: u64,
    #[validate(range(max = 60_000))]
    pub retry_delay_ms: u64,
    #[validate(range(min = 1, max = 1000))]
    pub requests_per_second: u32,
    #[validate(range(min = 1, max = 1000))]
    pub burst: u32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        let http = HttpOptions::default();
        Self {
            timeout_secs: http.timeout.as_secs(),
            retry_delay_ms: http.retry_delay.as_millis() as u64,
            requests_per_second: http.requests_per_second,
            burst: http.burst,
        }
    }
}

impl NetworkSettings {
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            requests_per_second: self.requests_per_second,
            burst: self.burst,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplySettings {
    /// Remove source folders left empty after renaming
    pub prune_empty_dirs: bool,
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self {
            prune_empty_dirs: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingSettings {
    #[validate(custom(function = "validate_level"))]
    pub level: String,
    /// Write a daily log file here in addition to stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// JSON lines in the log file
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from `path` (missing file means defaults) and the
    /// environment, then validate
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let settings: Self = ::config::Config::builder()
            .add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                ::config::Environment::with_prefix("REELNAME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("scan.extensions")
                    .with_list_parse_key("scan.sidecar_extensions"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as TOML, creating parent folders
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            min_similarity: self.matching.min_similarity,
            language: self.provider.language.clone(),
            fetch_imdb_id: self.provider.fetch_imdb_id,
            ..Default::default()
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            scan: self.scan.scan_options(),
            naming: self.naming.template(),
            concurrency: self.scan.concurrency,
        }
    }
}

/// Settings file to use: an explicit path, else `./reelname.toml` when it
/// exists, else `<config dir>/reelname/config.toml`
pub fn settings_path(explicit: Option<&Path>) -> Result<PathBuf, SettingsError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let local = PathBuf::from(LOCAL_SETTINGS_FILE);
    if local.is_file() {
        return Ok(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("reelname").join("config.toml"))
        .ok_or(SettingsError::NoConfigDir)
}

fn validate_template(template: &str) -> Result<(), ValidationError> {
    if !template.contains("{title}") {
        return Err(ValidationError::new("template_missing_title"));
    }
    if template.starts_with('/') || template.split('/').any(|c| c.trim() == "..") {
        return Err(ValidationError::new("template_escapes_root"));
    }
    Ok(())
}

fn validate_base_url(url: &str) -> Result<(), ValidationError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::new("base_url_scheme"))
    }
}

fn validate_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(()),
        _ => Err(ValidationError::new("unknown_log_level")),
    }
}
