//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! schedule-config.toml file. It covers how far ahead the merge looks, where the
//! synced timetables are cached, and how the terminal timeline is drawn.

use crate::merger::DEFAULT_HORIZON_DAYS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "schedule-config.toml";

/// Longest look-ahead accepted from the config file.
pub const MAX_HORIZON_DAYS: i64 = 366;

/// Longest timeline window accepted from the config file.
pub const MAX_TIMELINE_DAYS: i64 = 31;

/// Application configuration loaded from schedule-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Merge window settings
    pub schedule: ScheduleConfig,
    /// Where synced data is cached
    pub storage: StorageConfig,
    /// Terminal timeline settings
    pub display: DisplayConfig,
}

/// Merge window configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Days after today for which events are built
    pub horizon_days: i64,
    /// Days covered by the timeline, starting at local midnight today
    /// (2 = today + tomorrow, as the tile does)
    pub timeline_days: i64,
}

/// Cache location configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding timetable.json, exam_timetable.json and sync_state.json
    pub data_dir: PathBuf,
}

/// Terminal timeline configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Width of the ASCII timeline bar in columns
    pub width: usize,
    /// Maximum number of segments printed
    pub max_segments: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            horizon_days: DEFAULT_HORIZON_DAYS,
            timeline_days: 2,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: PathBuf::from("schedule-data"),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            width: 48,
            max_segments: 12,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            schedule: ScheduleConfig::default(),
            storage: StorageConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from schedule-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    log::info!("Loaded configuration from {}", path.display());
                    config.sanitized()
                }
                Err(e) => {
                    log::warn!("Invalid config file format: {e}");
                    log::warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Clamp values that would make the merge or the timeline meaningless.
    fn sanitized(mut self) -> Self {
        if !(0..=MAX_HORIZON_DAYS).contains(&self.schedule.horizon_days) {
            let clamped = self.schedule.horizon_days.clamp(0, MAX_HORIZON_DAYS);
            log::warn!("horizon_days must be within 0..={MAX_HORIZON_DAYS}, using {clamped}");
            self.schedule.horizon_days = clamped;
        }
        if !(1..=MAX_TIMELINE_DAYS).contains(&self.schedule.timeline_days) {
            let clamped = self.schedule.timeline_days.clamp(1, MAX_TIMELINE_DAYS);
            log::warn!("timeline_days must be within 1..={MAX_TIMELINE_DAYS}, using {clamped}");
            self.schedule.timeline_days = clamped;
        }
        self.display.width = self.display.width.max(8);
        self
    }
}
