use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyVaultError};
use crate::kv;

pub const DATA_DIR_ENV: &str = "STUDYVAULT_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".studyvault";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub database_file: String,
    /// Pending state mutations tolerated before the snapshot is written.
    pub flush_every: usize,
    /// Upper bound, in bytes, on text handed to the content-analysis oracle.
    pub analysis_char_limit: usize,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database_file: "vault.sqlite".to_string(),
            flush_every: 8,
            analysis_char_limit: 30_000,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }
}

pub fn config_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.json")
}

/// Resolve the data directory: explicit flag, then environment, then default.
pub fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Missing or unreadable config falls back to defaults.
pub fn load_config(data_dir: &Path) -> AppConfig {
    let path = config_file_path(data_dir);
    let mut config = match std::fs::read_to_string(&path) {
        Ok(data) => serde_json::from_str::<AppConfig>(&data).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "ignoring malformed config");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    };
    config.data_dir = data_dir.to_path_buf();
    if config.flush_every == 0 {
        config.flush_every = 1;
    }
    config
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let path = config_file_path(&config.data_dir);
    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| StudyVaultError::io(e, &config.data_dir))?;
    let json = serde_json::to_string_pretty(config)?;
    kv::write_atomic(&path, json.as_bytes()).map_err(|e| StudyVaultError::io(e, &path))
}
