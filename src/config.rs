use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::entities::table::PAGE_SIZE_OPTIONS;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";
pub const MIN_DEBOUNCE_MS: u64 = 300;
pub const MAX_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve the application data directory")]
    NoProjectDirs,
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    api_base_url: Option<String>,
    api_token: Option<String>,
    debounce_ms: Option<u64>,
    default_page_size: Option<usize>,
    db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub debounce: Duration,
    pub default_page_size: NonZeroUsize,
    pub db_path: PathBuf,
}

impl AppConfig {
    /// Reads `config.toml` from the platform config dir, then applies
    /// `SIHKA_API_URL`, `SIHKA_API_TOKEN`, `SIHKA_DEBOUNCE_MS` and
    /// `SIHKA_DB_PATH`.
    pub fn load() -> Result<Self, ConfigError> {
        let dirs = project_dirs()?;
        let file = read_file_config(&dirs.config_dir().join("config.toml"))?;
        Self::resolve(file, dirs.data_dir().join("sihka-table.sqlite"), |key| {
            std::env::var(key).ok()
        })
    }

    pub fn from_toml_str(text: &str, default_db_path: PathBuf) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::resolve(file, default_db_path, |_| None)
    }

    fn resolve<F>(file: FileConfig, default_db_path: PathBuf, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = env("SIHKA_API_URL")
            .or(file.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_token = env("SIHKA_API_TOKEN")
            .or(file.api_token)
            .filter(|token| !token.trim().is_empty());

        let debounce_ms = match env("SIHKA_DEBOUNCE_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "SIHKA_DEBOUNCE_MS",
                value: raw.clone(),
            })?,
            None => file.debounce_ms.unwrap_or(MAX_DEBOUNCE_MS),
        };

        let page_size = file.default_page_size.unwrap_or(PAGE_SIZE_OPTIONS[0]);
        if !PAGE_SIZE_OPTIONS.contains(&page_size) {
            return Err(ConfigError::Invalid {
                key: "default_page_size",
                value: page_size.to_string(),
            });
        }
        let default_page_size = NonZeroUsize::new(page_size).ok_or(ConfigError::Invalid {
            key: "default_page_size",
            value: page_size.to_string(),
        })?;

        let db_path = env("SIHKA_DB_PATH")
            .map(PathBuf::from)
            .or(file.db_path)
            .unwrap_or(default_db_path);

        Ok(Self {
            api_base_url,
            api_token,
            debounce: Duration::from_millis(debounce_ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS)),
            default_page_size,
            db_path,
        })
    }
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("id", "sihka", "sihka-table").ok_or(ConfigError::NoProjectDirs)
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
