//! One StaleWatch invocation, end to end.
//!
//! window → detect (weekend gate) → confirm (persist) → validate → recommend.
//!
//! Source problems and short history end the run early with an empty result
//! and leave the tracking state untouched. Only a failed state save is an
//! error.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{info, warn};

use stalewatch_core::data::{HistoryWindow, PriceHistorySource, SymbolUniverse};
use stalewatch_core::domain::{ConfirmedSignal, Symbol, SymbolSignal};
use stalewatch_core::validate::{ValidationResult, Validator};
use stalewatch_core::{
    ConfirmationEngine, DetectionEngine, DetectionOutcome, DetectionSummary, StateError,
    StateStore,
};

use crate::config::StaleWatchConfig;
use crate::recommend::{self, Recommendations};
use crate::report::dataset_hash;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not persist tracking state: {0}")]
    State(#[from] StateError),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Completed,
    NonBusinessDay,
    InsufficientHistory,
    MissingSource,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "COMPLETED",
            RunStatus::NonBusinessDay => "NON_BUSINESS_DAY",
            RunStatus::InsufficientHistory => "INSUFFICIENT_HISTORY",
            RunStatus::MissingSource => "MISSING_SOURCE",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub status: RunStatus,
    pub today: NaiveDate,
    /// Raw detection output, sorted.
    pub signals: Vec<SymbolSignal>,
    pub detection_summary: DetectionSummary,
    pub confirmed: Vec<ConfirmedSignal>,
    pub newly_tracked: Vec<Symbol>,
    pub recovered: Vec<Symbol>,
    pub validations: Vec<ValidationResult>,
    pub recommendations: Recommendations,
    pub universe_size: usize,
    pub dataset_hash: Option<String>,
}

impl PipelineOutcome {
    fn skipped(status: RunStatus, today: NaiveDate, universe_size: usize) -> Self {
        Self {
            status,
            today,
            signals: Vec::new(),
            detection_summary: DetectionSummary::default(),
            confirmed: Vec::new(),
            newly_tracked: Vec::new(),
            recovered: Vec::new(),
            validations: Vec::new(),
            recommendations: Recommendations::empty(universe_size),
            universe_size,
            dataset_hash: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Result of the detection stage alone.
#[derive(Debug, Clone)]
pub struct DetectionRun {
    pub status: RunStatus,
    pub signals: Vec<SymbolSignal>,
    pub universe_size: usize,
    pub window: Option<HistoryWindow>,
}

/// Detection without touching the tracking state.
///
/// `history` is `None` when the price source could not be opened. The
/// business-day gate is [`DetectionEngine::detect`]'s.
pub fn run_detection(
    config: &StaleWatchConfig,
    history: Option<&dyn PriceHistorySource>,
    universe: &dyn SymbolUniverse,
    today: NaiveDate,
) -> DetectionRun {
    let skipped = |status, universe_size| DetectionRun {
        status,
        signals: Vec::new(),
        universe_size,
        window: None,
    };

    let symbols: BTreeSet<Symbol> = universe.symbols().unwrap_or_else(|e| {
        warn!(error = %e, "symbol universe unavailable, checking history symbols only");
        BTreeSet::new()
    });

    let Some(history) = history else {
        warn!("price history unavailable, skipping detection");
        return skipped(RunStatus::MissingSource, symbols.len());
    };

    let window = match HistoryWindow::load(history, config.detection.window_days) {
        Ok(w) => w,
        Err(e) => {
            warn!(source = history.name(), error = %e, "failed to load history window");
            return skipped(RunStatus::MissingSource, symbols.len());
        }
    };

    let engine = DetectionEngine::new(config.thresholds.clone());
    match engine.detect(today, &window, &symbols) {
        DetectionOutcome::Detected(signals) => DetectionRun {
            status: RunStatus::Completed,
            signals,
            universe_size: symbols.len(),
            window: Some(window),
        },
        DetectionOutcome::InsufficientHistory { .. } => {
            skipped(RunStatus::InsufficientHistory, symbols.len())
        }
        DetectionOutcome::NonBusinessDay => skipped(RunStatus::NonBusinessDay, symbols.len()),
    }
}

/// Full run. The tracking state is saved before validation starts.
pub fn run_pipeline(
    config: &StaleWatchConfig,
    history: Option<&dyn PriceHistorySource>,
    universe: &dyn SymbolUniverse,
    store: &dyn StateStore,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<PipelineOutcome, PipelineError> {
    let detection = run_detection(config, history, universe, today);
    let Some(window) = detection.window.as_ref().filter(|_| detection.status == RunStatus::Completed)
    else {
        info!(status = %detection.status, "run ended without detection");
        return Ok(PipelineOutcome::skipped(
            detection.status,
            today,
            detection.universe_size,
        ));
    };

    let detection_summary = DetectionSummary::from_signals(&detection.signals);
    let confirmation = ConfirmationEngine::new(config.confirmation.required_failures).run(
        store,
        &detection.signals,
        today,
    )?;

    let mut validator = Validator::new(config.thresholds.clone())
        .with_history_days(config.validation.history_days);
    if let Some(source) = history {
        validator = validator.with_source(source);
    }
    let validations = validator.validate_all(&confirmation.confirmed, now);

    let recommendations = recommend::build(
        &confirmation.confirmed,
        &validations,
        detection.universe_size,
    );

    info!(
        flagged = detection_summary.total_flagged,
        confirmed = confirmation.confirmed.len(),
        validated = validations.len(),
        score = recommendations.risk_assessment.data_quality_score,
        "run complete"
    );

    Ok(PipelineOutcome {
        status: RunStatus::Completed,
        today,
        dataset_hash: Some(dataset_hash(window)),
        signals: detection.signals,
        detection_summary,
        confirmed: confirmation.confirmed,
        newly_tracked: confirmation.newly_tracked,
        recovered: confirmation.recovered,
        validations,
        recommendations,
        universe_size: detection.universe_size,
    })
}
