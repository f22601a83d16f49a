//! TOML configuration for a StaleWatch run.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration. Example:
//!
//! ```toml
//! [detection]
//! window_days = 10
//!
//! [thresholds]
//! penny_price = 1.0
//! stale_days = 3
//!
//! [confirmation]
//! required_failures = 3
//!
//! [paths]
//! history = "data/daily_prices.parquet"
//! watchlist = "data/my_main_512.txt"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use stalewatch_core::confirm::DEFAULT_REQUIRED_FAILURES;
use stalewatch_core::detect::MIN_TRADING_DATES;
use stalewatch_core::rules::Thresholds;
use stalewatch_core::validate::VALIDATION_HISTORY_DAYS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full run configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaleWatchConfig {
    pub detection: DetectionConfig,
    pub thresholds: Thresholds,
    pub confirmation: ConfirmationConfig,
    pub validation: ValidationConfig,
    pub paths: PathsConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Distinct trading dates pulled into the detection window.
    pub window_days: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { window_days: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Consecutive flagged runs before a symbol is confirmed.
    pub required_failures: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            required_failures: DEFAULT_REQUIRED_FAILURES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Observations pulled per symbol for the validation re-check.
    pub history_days: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            history_days: VALIDATION_HISTORY_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Daily price history (`.parquet` or `.csv`).
    pub history: PathBuf,
    /// Watchlist text file.
    pub watchlist: PathBuf,
    /// Confirmation tracking state (JSON).
    pub state: PathBuf,
    /// Where reports and the cleanup script are written.
    pub output_dir: PathBuf,
    /// Append-only removal log (JSON).
    pub removal_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            history: PathBuf::from("data/daily_prices.parquet"),
            watchlist: PathBuf::from("data/my_main_512.txt"),
            state: PathBuf::from("data/stale_tracking.json"),
            output_dir: PathBuf::from("data"),
            removal_log: PathBuf::from("data/removal_log.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Confirmed signals listed in the stale price report.
    pub top_securities: usize,
    /// Watchlist label recorded in removal log entries. Defaults to the
    /// watchlist file name.
    pub watchlist_name: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_securities: 50,
            watchlist_name: None,
        }
    }
}

impl StaleWatchConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engines cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        if self.detection.window_days < MIN_TRADING_DATES {
            return Err(ConfigError::Invalid(format!(
                "detection.window_days must be at least {MIN_TRADING_DATES}, got {}",
                self.detection.window_days
            )));
        }
        if self.confirmation.required_failures == 0 {
            return Err(ConfigError::Invalid(
                "confirmation.required_failures must be at least 1".into(),
            ));
        }
        if self.validation.history_days == 0 {
            return Err(ConfigError::Invalid(
                "validation.history_days must be at least 1".into(),
            ));
        }
        if t.extreme_penny_price >= t.penny_price {
            return Err(ConfigError::Invalid(format!(
                "thresholds.extreme_penny_price ({}) must be below penny_price ({})",
                t.extreme_penny_price, t.penny_price
            )));
        }
        if t.stale_days < 2 {
            return Err(ConfigError::Invalid(
                "thresholds.stale_days must be at least 2".into(),
            ));
        }
        Ok(())
    }

    /// Label for removal log entries.
    pub fn watchlist_name(&self) -> String {
        self.report.watchlist_name.clone().unwrap_or_else(|| {
            self.paths
                .watchlist
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| self.paths.watchlist.display().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = StaleWatchConfig::from_toml("").unwrap();
        assert_eq!(config, StaleWatchConfig::default());
        assert_eq!(config.detection.window_days, 10);
        assert_eq!(config.confirmation.required_failures, 3);
        assert_eq!(config.thresholds.penny_price, 1.0);
        assert_eq!(config.report.top_securities, 50);
        assert_eq!(config.watchlist_name(), "my_main_512.txt");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let toml = r#"
[thresholds]
penny_price = 0.5

[confirmation]
required_failures = 5

[paths]
history = "prices.csv"

[report]
watchlist_name = "core"
"#;
        let config = StaleWatchConfig::from_toml(toml).unwrap();
        assert_eq!(config.thresholds.penny_price, 0.5);
        assert_eq!(config.thresholds.stale_days, 3);
        assert_eq!(config.confirmation.required_failures, 5);
        assert_eq!(config.paths.history, PathBuf::from("prices.csv"));
        assert_eq!(config.paths.state, PathBuf::from("data/stale_tracking.json"));
        assert_eq!(config.watchlist_name(), "core");
    }

    #[test]
    fn rejects_short_window() {
        let err = StaleWatchConfig::from_toml("[detection]\nwindow_days = 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_required_failures() {
        let err =
            StaleWatchConfig::from_toml("[confirmation]\nrequired_failures = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_inverted_penny_thresholds() {
        let toml = "[thresholds]\npenny_price = 0.01\nextreme_penny_price = 0.05\n";
        assert!(matches!(
            StaleWatchConfig::from_toml(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            StaleWatchConfig::from_toml("[detection\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn from_file_reads_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("stalewatch.toml");
        std::fs::write(&path, "[detection]\nwindow_days = 15\n").unwrap();
        let config = StaleWatchConfig::from_file(&path).unwrap();
        assert_eq!(config.detection.window_days, 15);

        assert!(matches!(
            StaleWatchConfig::from_file(&tmp.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
