//! Scan configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial (or absent)
//! file is valid. Durations are humantime strings such as `"15m"` or `"5s"`.

use crate::error::{PulseError, Result};
use crate::util::expand_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "devpulse";
const CONFIG_FILE: &str = "config.json";
const SNAPSHOT_FILE: &str = "snapshot.bin";

/// Upper bound for any day count in the config (a century).
pub const MAX_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub author: String,
    pub roots: Vec<PathBuf>,
    pub exclude: Vec<String>,
    pub max_depth: usize,
    pub dormant_days: i64,
    pub lookback_days: i64,
    pub refresh_interval: String,
    pub staleness_window: String,
    pub oracle_timeout: String,
    pub detailed_stats: bool,
    pub min_lines_per_file: u64,
    pub include_merges: bool,
    pub git_binary: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            author: String::new(),
            roots: dirs::home_dir().into_iter().collect(),
            exclude: vec![
                "**/node_modules".to_string(),
                "**/target".to_string(),
                "**/.cache".to_string(),
                "**/vendor".to_string(),
            ],
            max_depth: 4,
            dormant_days: 14,
            lookback_days: 365,
            refresh_interval: "15m".to_string(),
            staleness_window: "15m".to_string(),
            oracle_timeout: "5s".to_string(),
            detailed_stats: true,
            min_lines_per_file: 0,
            include_merges: true,
            git_binary: PathBuf::from("git"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&raw)?;
        config.roots = config
            .roots
            .iter()
            .map(|p| expand_home(&p.to_string_lossy()))
            .collect();
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, else the default location when it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(default) if default.exists() => Self::load(&default),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_DAYS).contains(&self.dormant_days) {
            return Err(PulseError::Config(format!(
                "dormant_days must be between 0 and {MAX_DAYS}"
            )));
        }
        if !(1..=MAX_DAYS).contains(&self.lookback_days) {
            return Err(PulseError::Config(format!(
                "lookback_days must be between 1 and {MAX_DAYS}"
            )));
        }
        self.refresh_interval()?;
        self.staleness_window()?;
        self.oracle_timeout()?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Result<Duration> {
        Ok(humantime::parse_duration(&self.refresh_interval)?)
    }

    pub fn staleness_window(&self) -> Result<Duration> {
        Ok(humantime::parse_duration(&self.staleness_window)?)
    }

    pub fn oracle_timeout(&self) -> Result<Duration> {
        Ok(humantime::parse_duration(&self.oracle_timeout)?)
    }

    pub fn extract_settings(&self) -> ExtractSettings {
        ExtractSettings {
            author: self.author.clone(),
            dormant_days: self.dormant_days,
            lookback_days: self.lookback_days,
            detailed_stats: self.detailed_stats,
            min_lines_per_file: self.min_lines_per_file,
            include_merges: self.include_merges,
        }
    }
}

/// The subset of configuration the extractor needs for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractSettings {
    pub author: String,
    pub dormant_days: i64,
    pub lookback_days: i64,
    pub detailed_stats: bool,
    pub min_lines_per_file: u64,
    pub include_merges: bool,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Config::default().extract_settings()
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}

pub fn default_snapshot_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join(SNAPSHOT_FILE)
}
