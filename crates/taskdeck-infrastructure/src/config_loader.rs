use crate::paths::TaskdeckPaths;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use taskdeck_core::{Result, SyncConfig};

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "TASKDECK_API_URL";

/// Loads `SyncConfig` from a TOML file.
///
/// Precedence, highest first:
/// 1. `TASKDECK_API_URL` (base URL only)
/// 2. The config file
/// 3. Built-in defaults
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// A loader for `<config_dir>/taskdeck/config.toml`.
    pub fn new_default() -> Result<Self> {
        Ok(Self::with_path(TaskdeckPaths::config_file()?))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and validates the configuration, then applies the environment
    /// override. A missing or empty file yields the defaults.
    pub fn load(&self) -> Result<SyncConfig> {
        let config = self.load_file()?;
        let config = apply_env_override(config, std::env::var(API_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    fn load_file(&self) -> Result<SyncConfig> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Config file {} not found, using defaults", self.path.display());
                return Ok(SyncConfig::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(SyncConfig::default());
        }

        let config = SyncConfig::from_toml_str(&content)?;
        tracing::debug!("Loaded config from {}", self.path.display());
        Ok(config)
    }
}

/// Replaces `api.base_url` with `url` when set and non-blank.
pub fn apply_env_override(mut config: SyncConfig, url: Option<String>) -> SyncConfig {
    if let Some(url) = url.filter(|url| !url.trim().is_empty()) {
        tracing::debug!("{} overrides api.base_url", API_URL_ENV);
        config.api.base_url = url;
    }
    config
}
