//! Client configuration.
//!
//! Settings come from a TOML file with environment overrides on top:
//! `DOCINTAKE_API_BASE_URL` and `DOCINTAKE_SCHOOL_ID` always win. The
//! base URL is required; the school id falls back to the deployment
//! default when nothing else provides one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use url::Url;

/// School id used when neither the config file nor the environment
/// provides one.
pub const DEFAULT_SCHOOL_ID: &str = "342635";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {} is not valid TOML: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(
        "api_base_url is not configured; set it in {} or DOCINTAKE_API_BASE_URL",
        .path.display()
    )]
    MissingBaseUrl { path: PathBuf },

    #[error("invalid api_base_url {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("could not write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk config shape; every field optional so a partial file works.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileConfig {
    api_base_url: Option<String>,
    school_id: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: Url,
    pub school_id: String,
    pub request_timeout: Duration,
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docintake")
            .join("config.toml")
    }

    /// Load configuration from `path` (or the default location), then
    /// apply environment overrides. A missing file is fine; a missing
    /// base URL is not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        let file = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            toml::from_str::<FileConfig>(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            FileConfig::default()
        };

        let base_url = std::env::var("DOCINTAKE_API_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or(file.api_base_url)
            .ok_or(ConfigError::MissingBaseUrl { path: path.clone() })?;
        let api_base_url = Url::parse(&base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url,
            source,
        })?;

        let school_id = std::env::var("DOCINTAKE_SCHOOL_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or(file.school_id)
            .unwrap_or_else(|| {
                warn!("school id not configured, using default {DEFAULT_SCHOOL_ID}");
                DEFAULT_SCHOOL_ID.to_string()
            });

        let request_timeout =
            Duration::from_secs(file.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        Ok(Self {
            api_base_url,
            school_id,
            request_timeout,
        })
    }

    /// Write a commented starter config to `path`, creating parent
    /// directories as needed. Refuses to overwrite an existing file.
    pub fn write_starter(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let starter = format!(
            "# docintake configuration\n\
             \n\
             # Base URL of the school backend API (required).\n\
             api_base_url = \"https://api.example.com/api\"\n\
             \n\
             # School this client operates on.\n\
             school_id = \"{DEFAULT_SCHOOL_ID}\"\n\
             \n\
             # Per-request timeout in seconds.\n\
             request_timeout_secs = {DEFAULT_TIMEOUT_SECS}\n"
        );
        fs::write(path, starter).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_path(input: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(input).into_owned())
}
