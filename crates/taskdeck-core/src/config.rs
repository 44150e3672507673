use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SyncConfig {
    pub api: ApiConfig,
    pub refresh: RefreshConfig,
    pub notifications: NotificationConfig,
    pub store: StoreConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Applied to every remote call; a timeout rolls the mutation back
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RefreshConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Repeats of the same notification inside this window are dropped
    pub debounce_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { debounce_ms: 3000 }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Capacity of the store-change broadcast channel
    pub change_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { change_buffer: 256 }
    }
}

impl SyncConfig {
    /// Parses a TOML document. Missing sections and keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(SyncError::config("api.base_url must not be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(SyncError::config("api.timeout_secs must be greater than 0"));
        }
        if self.refresh.interval_secs == 0 {
            return Err(SyncError::config("refresh.interval_secs must be greater than 0"));
        }
        if self.store.change_buffer == 0 {
            return Err(SyncError::config("store.change_buffer must be greater than 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.notifications.debounce_ms)
    }
}
