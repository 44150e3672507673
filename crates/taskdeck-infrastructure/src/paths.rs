//! Path resolution for taskdeck configuration and logs.
//!
//! ```text
//! <config_dir>/taskdeck/        # e.g. ~/.config/taskdeck on Linux
//! ├── config.toml               # SyncConfig
//! └── logs/                     # Daily-rolling CLI logs
//!     └── taskdeck.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;
use taskdeck_core::{Result, SyncError};

const APP_DIR: &str = "taskdeck";

pub struct TaskdeckPaths;

impl TaskdeckPaths {
    /// Returns the taskdeck configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/taskdeck/`)
    /// - `Err(SyncError::Config)`: The platform config directory is unknown
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| SyncError::config("cannot determine the user config directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn log_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("logs"))
    }
}
