// config.rs - Shell Settings Persistence
//
// Settings are stored as JSON in the platform config directory:
// - Linux: `~/.config/TrayShell/settings.json`
// - Windows: `%APPDATA%\TrayShell\settings.json`
// - macOS: `~/Library/Application Support/TrayShell/settings.json`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::constants::{config, tray};

/// Shell settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Application display name
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Whether to show a tray icon at all
    #[serde(default = "default_true")]
    pub tray_enabled: bool,

    /// Tray tooltip text
    #[serde(default = "default_tooltip")]
    pub tray_tooltip: String,

    /// Tray title (macOS and Linux only)
    #[serde(default)]
    pub tray_title: Option<String>,

    /// Encoded tray icon image (PNG or ICO)
    #[serde(default)]
    pub icon_path: Option<PathBuf>,

    /// Log filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_app_name() -> String {
    tray::DEFAULT_TOOLTIP.into()
}

fn default_true() -> bool {
    true
}

fn default_tooltip() -> String {
    tray::DEFAULT_TOOLTIP.into()
}

fn default_log_level() -> String {
    config::DEFAULT_LOG_LEVEL.into()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            tray_enabled: true,
            tray_tooltip: default_tooltip(),
            tray_title: None,
            icon_path: None,
            log_level: default_log_level(),
        }
    }
}

impl ShellConfig {
    /// Platform settings file location
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(config::DIR_NAME)
            .join(config::FILE_NAME)
    }

    /// Load settings from the platform location, falling back to defaults
    /// when the file is missing or unreadable.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to load settings from {:?}: {:#}", path, e);
                Self::default()
            }
        }
    }

    /// Load settings from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file {:?}", path))?;
        info!("Settings loaded from {:?}", path);
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings {:?}", path))?;
        info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Read the configured tray icon, if any
    pub fn load_icon(&self) -> Result<Option<Vec<u8>>> {
        let Some(path) = &self.icon_path else {
            return Ok(None);
        };
        let bytes = fs::read(path).with_context(|| format!("Failed to read tray icon {:?}", path))?;
        Ok(Some(bytes))
    }
}
