//! Application configuration
//!
//! Handles loading and managing configuration from cdvd.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::disc::DEFAULT_RAW_TIMEOUT_SECS;

/// Name of the configuration file
pub const CONFIG_FILE: &str = "cdvd.json";

/// Global application config
static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application config
pub fn get_config() -> &'static AppConfig {
    APP_CONFIG.get_or_init(AppConfig::load)
}

/// Root application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub drive: DriveConfig,
}

/// Drive access configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DriveConfig {
    /// Drive to open, e.g. `\\.\D:`. Non-Windows hosts open a disc image file
    #[serde(default = "default_device_path")]
    pub device_path: String,
    /// Timeout for each raw sector command, in seconds
    #[serde(default = "default_raw_read_timeout")]
    pub raw_read_timeout_secs: u32,
    #[serde(default)]
    pub spindle: SpindleConfig,
}

#[cfg(windows)]
fn default_device_path() -> String {
    r"\\.\D:".to_string()
}

#[cfg(not(windows))]
fn default_device_path() -> String {
    "disc.iso".to_string()
}

fn default_raw_read_timeout() -> u32 {
    DEFAULT_RAW_TIMEOUT_SECS
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            device_path: default_device_path(),
            raw_read_timeout_secs: default_raw_read_timeout(),
            spindle: SpindleConfig::default(),
        }
    }
}

/// Spindle speed limits applied while a drive is open
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SpindleConfig {
    #[serde(default = "default_spindle_enabled")]
    pub enabled: bool,
    /// CD read speed in KB/s (~32x)
    #[serde(default = "default_cd_speed")]
    pub cd_speed_kbs: u16,
    /// DVD read speed in KB/s (~8x)
    #[serde(default = "default_dvd_speed")]
    pub dvd_speed_kbs: u16,
}

fn default_spindle_enabled() -> bool {
    true
}

fn default_cd_speed() -> u16 {
    4800
}

fn default_dvd_speed() -> u16 {
    11080
}

impl Default for SpindleConfig {
    fn default() -> Self {
        Self {
            enabled: default_spindle_enabled(),
            cd_speed_kbs: default_cd_speed(),
            dvd_speed_kbs: default_dvd_speed(),
        }
    }
}

impl AppConfig {
    /// Load configuration from cdvd.json
    pub fn load() -> Self {
        // Try to load from current directory first
        if let Ok(config) = Self::load_from_path(CONFIG_FILE) {
            log::info!("Loaded config from ./{}", CONFIG_FILE);
            return config;
        }

        // Try to load from executable directory
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let config_path = exe_dir.join(CONFIG_FILE);
                if let Ok(config) = Self::load_from_path(&config_path) {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
            }
        }

        log::info!("No {} found, using defaults", CONFIG_FILE);
        Self::default()
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.into();
        let content = fs::read_to_string(&path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}
