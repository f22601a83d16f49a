//! Report documents and the artifact writer.
//!
//! Every file is written to `<name>.tmp` and renamed into place, so a reader
//! never sees a half-written report.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use stalewatch_core::data::HistoryWindow;
use stalewatch_core::domain::ConfirmedSignal;
use stalewatch_core::rules::{Thresholds, ValidationStatus};
use stalewatch_core::validate::{summarize, ValidationResult};
use stalewatch_core::DetectionSummary;

use crate::cleanup_script::render_cleanup_sql;
use crate::config::StaleWatchConfig;
use crate::pipeline::{PipelineOutcome, RunStatus};
use crate::recommend::Recommendations;
use crate::removal_log::RemovalLog;

pub const STALE_REPORT_FILE: &str = "stale_price_report.json";
pub const VALIDATION_REPORT_FILE: &str = "security_validation.json";
pub const RECOMMENDATIONS_FILE: &str = "cleanup_recommendations.json";
pub const CLEANUP_SCRIPT_FILE: &str = "cleanup_script.sql";

/// BLAKE3 fingerprint over every observation in the window.
///
/// Symbols are visited in sorted order so the hash is deterministic.
pub fn dataset_hash(window: &HistoryWindow) -> String {
    let mut hasher = blake3::Hasher::new();
    for (symbol, observations) in window.iter() {
        hasher.update(symbol.as_bytes());
        for o in observations {
            hasher.update(o.date.to_string().as_bytes());
            hasher.update(&o.close.to_le_bytes());
            hasher.update(&o.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Counts plus the knobs the run used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub status: RunStatus,
    /// Raw detection count, before confirmation.
    pub total_flagged: usize,
    pub confirmed: usize,
    pub newly_tracked: usize,
    pub recovered: usize,
    /// Breakdown of the confirmed set.
    pub high_risk: usize,
    pub medium_risk: usize,
    pub low_risk: usize,
    pub no_data: usize,
    pub penny: usize,
    pub extreme_penny: usize,
    pub stale: usize,
    pub thresholds: Thresholds,
    pub required_failures: u32,
    pub window_days: usize,
    pub dataset_hash: Option<String>,
}

/// The stale price report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StalePriceReport {
    pub timestamp: NaiveDateTime,
    pub summary: ReportSummary,
    /// Top confirmed signals in detection order.
    pub securities: Vec<ConfirmedSignal>,
    pub recommendations: Recommendations,
}

impl StalePriceReport {
    pub fn from_outcome(
        outcome: &PipelineOutcome,
        config: &StaleWatchConfig,
        timestamp: NaiveDateTime,
    ) -> Self {
        let signals: Vec<_> = outcome.confirmed.iter().map(|c| c.signal.clone()).collect();
        let breakdown = DetectionSummary::from_signals(&signals);

        Self {
            timestamp,
            summary: ReportSummary {
                status: outcome.status,
                total_flagged: outcome.detection_summary.total_flagged,
                confirmed: outcome.confirmed.len(),
                newly_tracked: outcome.newly_tracked.len(),
                recovered: outcome.recovered.len(),
                high_risk: breakdown.high_risk,
                medium_risk: breakdown.medium_risk,
                low_risk: breakdown.low_risk,
                no_data: breakdown.no_data,
                penny: breakdown.penny,
                extreme_penny: breakdown.extreme_penny,
                stale: breakdown.stale,
                thresholds: config.thresholds.clone(),
                required_failures: config.confirmation.required_failures,
                window_days: config.detection.window_days,
                dataset_hash: outcome.dataset_hash.clone(),
            },
            securities: outcome
                .confirmed
                .iter()
                .take(config.report.top_securities)
                .cloned()
                .collect(),
            recommendations: outcome.recommendations.clone(),
        }
    }
}

/// The validation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub timestamp: NaiveDateTime,
    pub total_validated: usize,
    pub summary: BTreeMap<ValidationStatus, usize>,
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new(results: Vec<ValidationResult>, timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            total_validated: results.len(),
            summary: summarize(&results),
            results,
        }
    }
}

/// Recommendations document with its own timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationsReport {
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub recommendations: Recommendations,
}

/// Serialize `doc` as pretty JSON and atomically replace `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, doc: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(doc).context("serialize report")?;
    write_text(path, &json)
}

/// Atomically replace `path` with `content`, creating parent directories.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content).with_context(|| format!("write {}", tmp.display()))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("rename {} into place", path.display()));
    }
    Ok(())
}

/// Paths written by [`write_run_artifacts`].
#[derive(Debug, Clone, Default)]
pub struct ArtifactPaths {
    pub stale_report: PathBuf,
    pub validation_report: PathBuf,
    pub recommendations: PathBuf,
    pub cleanup_script: Option<PathBuf>,
    pub removal_log: PathBuf,
    /// Symbols appended to the removal log by this run.
    pub newly_logged: Vec<String>,
}

/// Write every report for a completed run and update the removal log.
pub fn write_run_artifacts(
    outcome: &PipelineOutcome,
    config: &StaleWatchConfig,
    now: NaiveDateTime,
) -> Result<ArtifactPaths> {
    let dir = &config.paths.output_dir;
    let mut paths = ArtifactPaths {
        stale_report: dir.join(STALE_REPORT_FILE),
        validation_report: dir.join(VALIDATION_REPORT_FILE),
        recommendations: dir.join(RECOMMENDATIONS_FILE),
        removal_log: config.paths.removal_log.clone(),
        ..ArtifactPaths::default()
    };

    write_json(
        &paths.stale_report,
        &StalePriceReport::from_outcome(outcome, config, now),
    )?;
    write_json(
        &paths.validation_report,
        &ValidationReport::new(outcome.validations.clone(), now),
    )?;
    write_json(
        &paths.recommendations,
        &RecommendationsReport {
            timestamp: now,
            recommendations: outcome.recommendations.clone(),
        },
    )?;

    let delisted: Vec<String> = outcome
        .validations
        .iter()
        .filter(|v| v.status == ValidationStatus::Delisted)
        .map(|v| v.symbol.clone())
        .collect();
    if let Some(sql) = render_cleanup_sql(&delisted, now) {
        let path = dir.join(CLEANUP_SCRIPT_FILE);
        write_text(&path, &sql)?;
        paths.cleanup_script = Some(path);
    }

    let mut log = RemovalLog::load_or_recover(&paths.removal_log);
    paths.newly_logged = log.log_delisted(&outcome.validations, &config.watchlist_name(), now);
    if !paths.newly_logged.is_empty() {
        log.save(&paths.removal_log)?;
    }

    info!(dir = %dir.display(), "reports written");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stalewatch_core::domain::PriceRow;
    use tempfile::TempDir;

    fn row(symbol: &str, day: u32, close: f64) -> PriceRow {
        PriceRow::new(symbol, NaiveDate::from_ymd_opt(2024, 3, day).unwrap(), close, 100)
    }

    #[test]
    fn dataset_hash_is_deterministic_and_sensitive() {
        let a = HistoryWindow::from_rows(vec![row("A", 4, 1.0), row("B", 4, 2.0)], 10);
        let b = HistoryWindow::from_rows(vec![row("B", 4, 2.0), row("A", 4, 1.0)], 10);
        let c = HistoryWindow::from_rows(vec![row("A", 4, 1.0), row("B", 4, 2.5)], 10);
        assert_eq!(dataset_hash(&a), dataset_hash(&b));
        assert_ne!(dataset_hash(&a), dataset_hash(&c));
        assert_eq!(dataset_hash(&a).len(), 64);
    }

    #[test]
    fn write_json_creates_dirs_and_leaves_no_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/report.json");
        write_json(&path, &serde_json::json!({"ok": true})).unwrap();
        assert!(path.exists());
        assert!(!tmp.path().join("out/report.tmp").exists());
        let back: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["ok"], true);
    }

    #[test]
    fn validation_report_counts_statuses() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let result = |symbol: &str, status| ValidationResult {
            symbol: symbol.into(),
            status,
            reason: String::new(),
            last_price: None,
            avg_volume: None,
            data_source: stalewatch_core::ValidationSource::None,
            validated_at: at,
        };
        let report = ValidationReport::new(
            vec![
                result("A", ValidationStatus::Delisted),
                result("B", ValidationStatus::Delisted),
                result("C", ValidationStatus::Active),
            ],
            at,
        );
        assert_eq!(report.total_validated, 3);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["DELISTED"], 2);
        assert_eq!(json["summary"]["ACTIVE"], 1);
    }

    #[test]
    fn corrupt_removal_log_does_not_fail_the_run() {
        use crate::pipeline::run_pipeline;
        use stalewatch_core::data::{InMemoryHistory, Watchlist};
        use stalewatch_core::MemoryStateStore;

        let tmp = TempDir::new().unwrap();
        let mut config = StaleWatchConfig::default();
        config.confirmation.required_failures = 1;
        config.paths.output_dir = tmp.path().join("out");
        config.paths.removal_log = tmp.path().join("out/removal_log.json");
        std::fs::create_dir_all(&config.paths.output_dir).unwrap();
        std::fs::write(&config.paths.removal_log, "{ not json").unwrap();

        let rows: Vec<PriceRow> = (4..9).map(|d| row("LIVE", d, 20.0 + d as f64)).collect();
        let history = InMemoryHistory::from_rows("fixture", rows);
        let universe = Watchlist::from_symbols("main", ["LIVE", "GONE"]);
        let friday = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let now = friday.and_hms_opt(18, 0, 0).unwrap();
        let outcome = run_pipeline(
            &config,
            Some(&history),
            &universe,
            &MemoryStateStore::default(),
            friday,
            now,
        )
        .unwrap();

        let paths = write_run_artifacts(&outcome, &config, now).unwrap();
        assert_eq!(paths.newly_logged, vec!["GONE".to_string()]);
        let log = RemovalLog::load(&config.paths.removal_log).unwrap();
        assert_eq!(log.len(), 1);
        assert!(tmp.path().join("out/removal_log.json.corrupt").exists());
    }
}
