use std::env;
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::DEFAULT_BACKEND_URL;
use crate::params::Identity;

pub const BACKEND_URL_ENV: &str = "INTEGRATIONS_BACKEND_URL";
pub const USER_ENV: &str = "INTEGRATIONS_USER";
pub const ORG_ENV: &str = "INTEGRATIONS_ORG";

/// Application-specific configuration helpers.
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    root: PathBuf,
}

impl ConfigLocator {
    /// Attempt to discover the persistent configuration directory, creating it if needed.
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("app", "integrations", "integrations-rs")
            .ok_or(ConfigError::MissingProjectDirs)?;
        let config_dir = dirs.config_dir();
        fs::create_dir_all(config_dir).map_err(ConfigError::CreateDir)?;
        set_user_only_permissions(config_dir)?;
        Ok(Self {
            root: config_dir.to_path_buf(),
        })
    }

    pub fn from_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Where the TUI writes its log output.
    pub fn log_file(&self) -> PathBuf {
        self.root.join("integrations.log")
    }
}

fn set_user_only_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let metadata = fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o700);
        fs::set_permissions(path, permissions)?;
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

/// Optional on-disk settings; every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub backend_url: Option<String>,
    pub user: Option<String>,
    pub org: Option<String>,
}

impl FileConfig {
    pub fn load(locator: &ConfigLocator) -> Result<Self, ConfigError> {
        let path = locator.config_file();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }
}

/// Settings after applying file, environment and command-line layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: String,
    pub identity: Identity,
}

/// Values supplied on the command line; these win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_url: Option<String>,
    pub user: Option<String>,
    pub org: Option<String>,
}

impl Settings {
    /// Resolve settings as flag > environment > config file > default.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Self {
        Self::resolve_with(file, overrides, |key| env::var(key).ok())
    }

    fn resolve_with(
        file: FileConfig,
        overrides: Overrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let pick = |flag: Option<String>, key: &str, from_file: Option<String>, default: &str| {
            non_blank(flag)
                .or_else(|| non_blank(lookup(key)))
                .or_else(|| non_blank(from_file))
                .unwrap_or_else(|| default.to_owned())
        };
        let defaults = Identity::default();
        Self {
            backend_url: pick(
                overrides.backend_url,
                BACKEND_URL_ENV,
                file.backend_url,
                DEFAULT_BACKEND_URL,
            ),
            identity: Identity {
                user: pick(overrides.user, USER_ENV, file.user, &defaults.user),
                org: pick(overrides.org, ORG_ENV, file.org, &defaults.org),
            },
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Errors that can occur when working with configuration directories.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to determine configuration directory for integrations-rs")]
    MissingProjectDirs,
    #[error("failed to create configuration directory: {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("filesystem error: {0}")]
    Io(#[source] std::io::Error),
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}
