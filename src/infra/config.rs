//! Configuration loading from TOML files
//!
//! Every section and field is optional; anything missing falls back to the
//! engine's defaults (5-200 m step window, 5 s evaluation interval).

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
struct StorageConfig {
    /// Directory holding the JSONL store files
    #[serde(default = "default_data_dir")]
    data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct TrackingConfig {
    /// Steps below this are treated as GPS jitter (meters)
    #[serde(default = "default_min_step_m")]
    min_step_m: f64,
    /// Steps above this are implausible at the fix cadence (meters)
    #[serde(default = "default_max_step_m")]
    max_step_m: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { min_step_m: default_min_step_m(), max_step_m: default_max_step_m() }
    }
}

fn default_min_step_m() -> f64 {
    5.0
}

fn default_max_step_m() -> f64 {
    200.0
}

#[derive(Debug, Clone, Deserialize)]
struct MonitorConfig {
    /// Minimum spacing between evaluated fixes (milliseconds)
    #[serde(default = "default_min_check_interval_ms")]
    min_check_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { min_check_interval_ms: default_min_check_interval_ms() }
    }
}

fn default_min_check_interval_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
struct ReplayConfig {
    /// JSONL fix trace fed to the replay provider
    #[serde(default = "default_replay_file")]
    file: String,
    /// Wall-clock milliseconds per trace sample
    #[serde(default = "default_replay_tick_ms")]
    tick_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { file: default_replay_file(), tick_ms: default_replay_tick_ms() }
    }
}

fn default_replay_file() -> String {
    "fixes.jsonl".to_string()
}

fn default_replay_tick_ms() -> u64 {
    200
}

#[derive(Debug, Clone, Deserialize, Default)]
struct TomlConfig {
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    tracking: TrackingConfig,
    #[serde(default)]
    monitor: MonitorConfig,
    #[serde(default)]
    replay: ReplayConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    data_dir: String,
    min_step_m: f64,
    max_step_m: f64,
    min_check_interval_ms: u64,
    replay_file: String,
    replay_tick_ms: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            min_step_m: default_min_step_m(),
            max_step_m: default_max_step_m(),
            min_check_interval_ms: default_min_check_interval_ms(),
            replay_file: default_replay_file(),
            replay_tick_ms: default_replay_tick_ms(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            data_dir: toml_config.storage.data_dir,
            min_step_m: toml_config.tracking.min_step_m,
            max_step_m: toml_config.tracking.max_step_m,
            min_check_interval_ms: toml_config.monitor.min_check_interval_ms,
            replay_file: toml_config.replay.file,
            replay_tick_ms: toml_config.replay.tick_ms,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn data_dir(&self) -> &str {
        &self.data_dir
    }

    pub fn min_step_m(&self) -> f64 {
        self.min_step_m
    }

    pub fn max_step_m(&self) -> f64 {
        self.max_step_m
    }

    pub fn min_check_interval(&self) -> Duration {
        Duration::from_millis(self.min_check_interval_ms)
    }

    pub fn replay_file(&self) -> &str {
        &self.replay_file
    }

    pub fn replay_tick(&self) -> Duration {
        Duration::from_millis(self.replay_tick_ms)
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.data_dir(), "data");
        assert_eq!(config.min_step_m(), 5.0);
        assert_eq!(config.max_step_m(), 200.0);
        assert_eq!(config.min_check_interval(), Duration::from_secs(5));
        assert_eq!(config.replay_tick(), Duration::from_millis(200));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let toml_config: TomlConfig = toml::from_str("").unwrap();

        assert_eq!(toml_config.tracking.min_step_m, 5.0);
        assert_eq!(toml_config.monitor.min_check_interval_ms, 5000);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[tracking]
max_step_m = 300.0
"#,
        )
        .unwrap();

        assert_eq!(toml_config.tracking.max_step_m, 300.0);
        assert_eq!(toml_config.tracking.min_step_m, 5.0);
    }
}
