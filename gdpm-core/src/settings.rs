//! User settings (`settings.yaml` in the platform config directory)
//!
//! Every field is optional; a missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default deadline for metadata-only commands
pub const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 30;

/// Default deadline for commands that download content
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Environment variable that overrides the configured token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const SETTINGS_FILE: &str = "settings.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Token for the GitHub API and tarball downloads
    pub github_token: Option<String>,

    pub api_base_url: Option<String>,

    pub archive_base_url: Option<String>,

    pub metadata_timeout_secs: u64,

    pub download_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            github_token: None,
            api_base_url: None,
            archive_base_url: None,
            metadata_timeout_secs: DEFAULT_METADATA_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from `path`; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(Error::io("read", path, err)),
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings = serde_yaml_ng::from_str(&content).map_err(|source| Error::Settings {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// `settings.yaml` in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "gdpm", "gdpm")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| dirs::config_dir().map(|d| d.join("gdpm")))
            .map(|dir| dir.join(SETTINGS_FILE))
    }

    /// Token from the environment, falling back to the settings file
    pub fn github_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.github_token.clone().filter(|t| !t.trim().is_empty()))
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    #[cfg(feature = "remote")]
    pub fn github_config(&self) -> crate::remote::GitHubConfig {
        let defaults = crate::remote::GitHubConfig::default();
        crate::remote::GitHubConfig {
            api_base_url: self.api_base_url.clone().unwrap_or(defaults.api_base_url),
            archive_base_url: self
                .archive_base_url
                .clone()
                .unwrap_or(defaults.archive_base_url),
            token: self.github_token(),
        }
    }
}
