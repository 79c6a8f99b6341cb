/// Application configuration
///
/// Resolved in three layers, later layers winning:
/// 1. Built-in defaults
/// 2. Optional TOML file
///    - Linux: ~/.config/specimen-cam/config.toml
///    - macOS: ~/Library/Application Support/specimen-cam/config.toml
///    - Windows: %APPDATA%\specimen-cam\config.toml
/// 3. Environment variables `SPECIMEN_API_BASE_URL` and `SPECIMEN_TIMEOUT_SECS`
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_DIR: &str = "specimen-cam";
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Path of the identification endpoint relative to the base URL
pub const IDENTIFY_PATH: &str = "/api/species/identify";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid API base URL {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("invalid timeout {0:?}: expected a positive number of seconds")]
    InvalidTimeout(String),
    #[error("could not determine a cache directory for this user")]
    NoCacheDir,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the identification service
    pub api_base_url: Url,
    /// Upper bound for a single upload request
    pub request_timeout: Duration,
    /// Where developed stills are written
    pub capture_dir: PathBuf,
    /// Where transient upload copies live
    pub scratch_dir: PathBuf,
}

/// On-disk representation, every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    api_base_url: Option<String>,
    timeout_secs: Option<u64>,
    capture_dir: Option<PathBuf>,
    scratch_dir: Option<PathBuf>,
}

impl Config {
    /// Load defaults, the config file (if present) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let file = match config_file_path() {
            Some(path) if path.exists() => read_file(&path)?,
            _ => FileConfig::default(),
        };

        let env_url = std::env::var("SPECIMEN_API_BASE_URL").ok();
        let env_timeout = std::env::var("SPECIMEN_TIMEOUT_SECS").ok();

        Self::resolve(file, env_url, env_timeout, cache_root()?)
    }

    fn resolve(
        file: FileConfig,
        env_url: Option<String>,
        env_timeout: Option<String>,
        cache_root: PathBuf,
    ) -> Result<Self, ConfigError> {
        let raw_url = env_url
            .or(file.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url =
            Url::parse(&raw_url).map_err(|e| ConfigError::InvalidUrl(raw_url.clone(), e))?;

        let timeout_secs = match env_timeout {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            None => match file.timeout_secs {
                Some(0) => return Err(ConfigError::InvalidTimeout("0".to_string())),
                Some(secs) => secs,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            capture_dir: file
                .capture_dir
                .unwrap_or_else(|| cache_root.join("captures")),
            scratch_dir: file
                .scratch_dir
                .unwrap_or_else(|| cache_root.join("scratch")),
        })
    }

    /// Full URL of the identification endpoint
    ///
    /// Tolerates a trailing slash (or a path prefix) on the base URL.
    pub fn identify_url(&self) -> String {
        format!(
            "{}{}",
            self.api_base_url.as_str().trim_end_matches('/'),
            IDENTIFY_PATH
        )
    }

    /// Configuration rooted in a single directory, for tests
    #[cfg(test)]
    pub fn for_test(api_base_url: &str, root: &Path) -> Self {
        Self {
            api_base_url: Url::parse(api_base_url).unwrap(),
            request_timeout: Duration::from_secs(5),
            capture_dir: root.join("captures"),
            scratch_dir: root.join("scratch"),
        }
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("📁 Loaded config from {}", path.display());
    Ok(parsed)
}

fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn cache_root() -> Result<PathBuf, ConfigError> {
    dirs::cache_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::NoCacheDir)
}
