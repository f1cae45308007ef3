use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const APP_DIR: &str = "passdeck";
pub const CONFIG_FILE: &str = "config.json";
pub const LOG_FILE: &str = "passdeck.log";

/// Tunables read from `<config_dir>/passdeck/config.json`. Every field is optional.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub clipboard_clear_secs: u64,
    pub tick_millis: u64,
    pub decay_ticks: u32,
    pub generated_password_len: usize,
    pub mask_len: usize,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clipboard_clear_secs: 15,
            tick_millis: 100,
            decay_ticks: 150,
            generated_password_len: 16,
            mask_len: 12,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn clipboard_clear_after(&self) -> Duration {
        Duration::from_secs(self.clipboard_clear_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }

    pub fn resolved_log_file(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| dirs::data_local_dir().map(|d| d.join(APP_DIR).join(LOG_FILE)))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}

pub fn load_settings() -> Result<Settings> {
    match config_path() {
        Ok(path) => load_settings_from(&path),
        Err(_) => Ok(Settings::default()),
    }
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config in {}", path.display()))?;
    if settings.decay_ticks == 0 {
        return Err(anyhow!("decay_ticks must be at least 1 in {}", path.display()));
    }
    Ok(settings)
}
