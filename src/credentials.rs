//! API key storage

use crate::scraper::ProviderKind;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Variables checked for an API key, in order
pub const API_KEY_VARIABLES: &[&str] = &["REELNAME_API_KEY", "TMDB_API_KEY"];

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{0} is read-only")]
    ReadOnly(&'static str),
}

/// Provider and API key pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub provider: ProviderKind,
    api_key: String,
}

impl Credentials {
    pub fn new(provider: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Somewhere credentials can be read from and written to
pub trait CredentialStore: Send + Sync {
    /// Short name used in user-facing messages
    fn name(&self) -> &'static str;

    fn load(&self) -> Result<Option<Credentials>, CredentialError>;

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError>;
}

/// Reads the key from environment variables
#[derive(Debug, Clone)]
pub struct EnvCredentialStore {
    provider: ProviderKind,
    variables: Vec<String>,
}

impl EnvCredentialStore {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            variables: API_KEY_VARIABLES.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    pub fn with_variables(mut self, variables: &[&str]) -> Self {
        self.variables = variables.iter().map(|v| (*v).to_string()).collect();
        self
    }
}

impl CredentialStore for EnvCredentialStore {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        let key = self
            .variables
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());

        Ok(key.map(|key| Credentials::new(self.provider, key)))
    }

    fn save(&self, _credentials: &Credentials) -> Result<(), CredentialError> {
        Err(CredentialError::ReadOnly("environment"))
    }
}

/// Keeps `provider.name` and `provider.api_key` in the settings file,
/// leaving every other key untouched
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<Option<toml::Table>, CredentialError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content.parse::<toml::Table>()?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn name(&self) -> &'static str {
        "settings file"
    }

    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        let Some(table) = self.read_table()? else {
            return Ok(None);
        };
        let Some(provider) = table.get("provider").and_then(|v| v.as_table()) else {
            return Ok(None);
        };

        let key = provider
            .get("api_key")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|k| !k.is_empty());
        let Some(key) = key else {
            return Ok(None);
        };

        let kind = match provider.get("name") {
            Some(value) => value.clone().try_into::<ProviderKind>()?,
            None => ProviderKind::default(),
        };

        Ok(Some(Credentials::new(kind, key)))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let mut table = self.read_table()?.unwrap_or_default();

        let provider = table
            .entry("provider")
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !provider.is_table() {
            *provider = toml::Value::Table(toml::Table::new());
        }
        if let Some(provider) = provider.as_table_mut() {
            provider.insert(
                "name".to_string(),
                toml::Value::String(credentials.provider.to_string()),
            );
            provider.insert(
                "api_key".to_string(),
                toml::Value::String(credentials.api_key.clone()),
            );
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(&table)?)?;
        restrict_permissions(&self.path)?;

        debug!(path = %self.path.display(), "Stored API key");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Tries each store in order. Saving goes to the first writable one.
pub struct CredentialChain {
    stores: Vec<Box<dyn CredentialStore>>,
}

impl CredentialChain {
    pub fn new(stores: Vec<Box<dyn CredentialStore>>) -> Self {
        Self { stores }
    }

    /// Environment first, then the settings file at `settings_path`
    pub fn standard(provider: ProviderKind, settings_path: &Path) -> Self {
        Self::new(vec![
            Box::new(EnvCredentialStore::new(provider)),
            Box::new(FileCredentialStore::new(settings_path)),
        ])
    }

    /// First credentials found, with the name of the store that had them
    pub fn lookup(&self) -> Result<Option<(Credentials, &'static str)>, CredentialError> {
        for store in &self.stores {
            if let Some(credentials) = store.load()? {
                debug!(source = store.name(), "Found API key");
                return Ok(Some((credentials, store.name())));
            }
        }
        Ok(None)
    }
}

impl CredentialStore for CredentialChain {
    fn name(&self) -> &'static str {
        "credential chain"
    }

    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        Ok(self.lookup()?.map(|(credentials, _)| credentials))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        for store in &self.stores {
            match store.save(credentials) {
                Err(CredentialError::ReadOnly(_)) => continue,
                result => return result,
            }
        }
        Err(CredentialError::ReadOnly("credential chain"))
    }
}
