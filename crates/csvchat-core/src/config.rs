use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_IFRAME_BASE_URL: &str = "http://localhost:8000/graph/";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk config file (`<config_dir>/csvchat/config.json`)
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub iframe_base_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the user config file; a missing file yields an empty config
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::get_config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("csvchat").join("config.json"))
    }
}

/// The two process-wide settings, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub iframe_base_url: String,
}

impl Settings {
    /// Overrides (CLI or environment) win over the config file, which wins over defaults.
    pub fn resolve(
        file: &Config,
        api_base_url: Option<String>,
        iframe_base_url: Option<String>,
    ) -> Self {
        let api_base_url = pick(api_base_url, file.api_base_url.clone(), DEFAULT_API_BASE_URL);
        let iframe_base_url = pick(
            iframe_base_url,
            file.iframe_base_url.clone(),
            DEFAULT_IFRAME_BASE_URL,
        );

        Self {
            // Endpoints start with '/', so drop the base's trailing one.
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            iframe_base_url,
        }
    }

    pub fn to_config(&self) -> Config {
        Config {
            api_base_url: Some(self.api_base_url.clone()),
            iframe_base_url: Some(self.iframe_base_url.clone()),
        }
    }
}

fn pick(first: Option<String>, second: Option<String>, default: &str) -> String {
    first
        .filter(|v| !v.trim().is_empty())
        .or(second.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| default.to_string())
}
