//! Credential resolution.
//!
//! Credentials come from a YAML file (by default `~/.lab_manager`) and from
//! explicit arguments. Explicit, non-empty arguments always win over the file.
//! The file is re-read on every resolution and the result is an immutable
//! [`Credentials`] value owned by whichever client it is handed to.

use std::fmt;
use std::path::{Path, PathBuf};

use snafu::prelude::*;

use crate::common::{ConfigFileSnafu, ConfigurationSnafu, Result};

pub const CONFIG_FILE_NAME: &str = ".lab_manager";

/// `None` when the home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Keys recognised in the config file.
///
/// `organization`, `workspace` and `configuration` are not used by the
/// library, they are defaults for the command line and integration tooling.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub organization: Option<String>,
    pub workspace: Option<String>,
    pub configuration: Option<String>,
}

impl FileConfig {
    /// Loads the file at `path`. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "No config file found");
            return Ok(Self::default());
        }

        let file = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Yaml))
            .build()
            .and_then(|c| c.try_deserialize::<FileConfig>())
            .context(ConfigFileSnafu { path })?;

        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(file)
    }

    /// Loads `~/.lab_manager`. Without a home directory no file is read.
    pub fn load_default() -> Result<Self> {
        Self::load_from(default_config_path().as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                tracing::warn!("No home directory, skipping {CONFIG_FILE_NAME}");
                Ok(Self::default())
            }
        }
    }
}

/// Explicit values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    url: String,
    username: String,
    password: String,
}

fn pick(explicit: Option<String>, file: Option<&String>) -> Option<String> {
    explicit
        .filter(|v| !v.is_empty())
        .or_else(|| file.filter(|v| !v.is_empty()).cloned())
}

impl Credentials {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::from_sources(
            &FileConfig::default(),
            CredentialOverrides {
                url: Some(url.into()),
                username: Some(username.into()),
                password: Some(password.into()),
            },
        )
    }

    /// Reads the config file at `config_path` and applies `overrides` on top.
    pub fn resolve(config_path: &Path, overrides: CredentialOverrides) -> Result<Self> {
        let file = FileConfig::load(config_path)?;
        Self::from_sources(&file, overrides)
    }

    pub fn resolve_default(overrides: CredentialOverrides) -> Result<Self> {
        let file = FileConfig::load_default()?;
        Self::from_sources(&file, overrides)
    }

    /// Merges an already loaded file with explicit overrides.
    ///
    /// Missing fields are reported in the order url, username, password.
    pub fn from_sources(file: &FileConfig, overrides: CredentialOverrides) -> Result<Self> {
        let url = pick(overrides.url, file.url.as_ref());
        let username = pick(overrides.username, file.username.as_ref());
        let password = pick(overrides.password, file.password.as_ref());

        let url = url.context(ConfigurationSnafu {
            message: "Missing url",
        })?;
        let username = username.context(ConfigurationSnafu {
            message: "Missing username",
        })?;
        let password = password.context(ConfigurationSnafu {
            message: "Missing password",
        })?;

        Ok(Self {
            url,
            username,
            password,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
