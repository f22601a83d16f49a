//! Validation classifier: an independent re-check of confirmed symbols.
//!
//! Pulls a fresh, short history per symbol and maps it to exactly one
//! [`ValidationStatus`] through the ordered [`STATUS_RULES`] table. When the
//! history source is unavailable the classifier falls back to the signal the
//! detection engine already computed, evaluated with the same rules minus the
//! zero-volume check.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::PriceHistorySource;
use crate::domain::{ConfirmedSignal, PriceObservation, Symbol, SymbolSignal};
use crate::rules::{longest_same_price_run, Thresholds, ValidationStatus};

/// Observations pulled per symbol for validation.
pub const VALIDATION_HISTORY_DAYS: usize = 10;

/// Failure while scoring one symbol. Caught per symbol, never fatal.
#[derive(Debug, Error, PartialEq)]
pub enum ClassificationError {
    #[error("invalid close {close} on {date}")]
    InvalidPrice { date: NaiveDate, close: f64 },
}

/// What the status rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationMetrics {
    pub has_data: bool,
    pub latest_price: f64,
    pub avg_volume: f64,
    /// `None` when the zero-volume check is unavailable (cached-signal fallback).
    pub zero_volume_days: Option<usize>,
    pub max_same_price_run: usize,
}

impl ValidationMetrics {
    /// Metrics over the most recent `history_days` observations.
    pub fn from_history(
        observations: &[PriceObservation],
        history_days: usize,
    ) -> Result<Self, ClassificationError> {
        let start = observations.len().saturating_sub(history_days);
        let recent = &observations[start..];

        if let Some(bad) = recent.iter().find(|o| !o.is_sane()) {
            return Err(ClassificationError::InvalidPrice {
                date: bad.date,
                close: bad.close,
            });
        }

        let Some(last) = recent.last() else {
            return Ok(Self::no_data());
        };

        let closes: Vec<f64> = recent.iter().map(|o| o.close).collect();
        let total_volume: f64 = recent.iter().map(|o| o.volume as f64).sum();

        Ok(Self {
            has_data: true,
            latest_price: last.close,
            avg_volume: total_volume / recent.len() as f64,
            zero_volume_days: Some(recent.iter().filter(|o| o.is_zero_volume()).count()),
            max_same_price_run: longest_same_price_run(&closes).len,
        })
    }

    /// Reduced metrics from a detection signal.
    pub fn from_signal(signal: &SymbolSignal) -> Self {
        if signal.is_no_data {
            return Self::no_data();
        }
        Self {
            has_data: true,
            latest_price: signal.latest_close,
            avg_volume: signal.avg_volume,
            zero_volume_days: None,
            max_same_price_run: signal.max_consecutive,
        }
    }

    fn no_data() -> Self {
        Self {
            has_data: false,
            latest_price: 0.0,
            avg_volume: 0.0,
            zero_volume_days: None,
            max_same_price_run: 0,
        }
    }
}

/// One row of the status table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRule {
    NoData,
    BelowDelistedPrice,
    Suspended,
    BelowExtremePenny,
    PennyLowVolume,
    Penny,
    Suspicious,
    Monitor,
}

/// Evaluated top to bottom; first match wins, otherwise `ACTIVE`.
pub const STATUS_RULES: [StatusRule; 8] = [
    StatusRule::NoData,
    StatusRule::BelowDelistedPrice,
    StatusRule::Suspended,
    StatusRule::BelowExtremePenny,
    StatusRule::PennyLowVolume,
    StatusRule::Penny,
    StatusRule::Suspicious,
    StatusRule::Monitor,
];

impl StatusRule {
    pub fn status(self) -> ValidationStatus {
        match self {
            StatusRule::NoData | StatusRule::BelowDelistedPrice | StatusRule::BelowExtremePenny => {
                ValidationStatus::Delisted
            }
            StatusRule::Suspended => ValidationStatus::Suspended,
            StatusRule::PennyLowVolume => ValidationStatus::AtRisk,
            StatusRule::Penny => ValidationStatus::PennyStock,
            StatusRule::Suspicious => ValidationStatus::Suspicious,
            StatusRule::Monitor => ValidationStatus::Monitor,
        }
    }

    pub fn matches(self, m: &ValidationMetrics, t: &Thresholds) -> bool {
        if !m.has_data {
            return self == StatusRule::NoData;
        }
        let penny = m.latest_price < t.penny_price;
        match self {
            StatusRule::NoData => false,
            StatusRule::BelowDelistedPrice => m.latest_price < t.delisted_price,
            StatusRule::Suspended => m
                .zero_volume_days
                .is_some_and(|days| days >= t.suspended_zero_volume_days),
            StatusRule::BelowExtremePenny => m.latest_price < t.extreme_penny_price,
            StatusRule::PennyLowVolume => penny && m.avg_volume < t.low_volume,
            StatusRule::Penny => penny,
            StatusRule::Suspicious => m.max_same_price_run >= t.suspicious_run_days,
            StatusRule::Monitor => m.max_same_price_run >= t.monitor_run_days,
        }
    }

    fn reason(self, m: &ValidationMetrics, t: &Thresholds) -> String {
        match self {
            StatusRule::NoData => "no data".to_string(),
            StatusRule::BelowDelistedPrice => format!(
                "extreme penny stock (${:.4} < ${:.3})",
                m.latest_price, t.delisted_price
            ),
            StatusRule::Suspended => format!(
                "{} days with zero volume",
                m.zero_volume_days.unwrap_or_default()
            ),
            StatusRule::BelowExtremePenny => format!(
                "sub-penny price (${:.4} < ${:.2})",
                m.latest_price, t.extreme_penny_price
            ),
            StatusRule::PennyLowVolume => {
                format!("penny stock with low volume (${:.4})", m.latest_price)
            }
            StatusRule::Penny => format!("penny stock (${:.4})", m.latest_price),
            StatusRule::Suspicious => format!("{} days same price", m.max_same_price_run),
            StatusRule::Monitor => format!(
                "{} days same price but appears active",
                m.max_same_price_run
            ),
        }
    }
}

/// Map metrics to exactly one status and its reason.
pub fn classify(metrics: &ValidationMetrics, thresholds: &Thresholds) -> (ValidationStatus, String) {
    STATUS_RULES
        .iter()
        .find(|rule| rule.matches(metrics, thresholds))
        .map(|rule| (rule.status(), rule.reason(metrics, thresholds)))
        .unwrap_or_else(|| (ValidationStatus::Active, "trading normally".to_string()))
}

/// Where a validation result's metrics came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationSource {
    History,
    CachedSignal,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub symbol: Symbol,
    pub status: ValidationStatus,
    pub reason: String,
    pub last_price: Option<f64>,
    pub avg_volume: Option<f64>,
    pub data_source: ValidationSource,
    pub validated_at: NaiveDateTime,
}

/// Per-symbol classifier over an optional fresh history source.
pub struct Validator<'a> {
    thresholds: Thresholds,
    history_days: usize,
    source: Option<&'a dyn PriceHistorySource>,
}

impl<'a> Validator<'a> {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            history_days: VALIDATION_HISTORY_DAYS,
            source: None,
        }
    }

    pub fn with_source(mut self, source: &'a dyn PriceHistorySource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_history_days(mut self, days: usize) -> Self {
        self.history_days = days;
        self
    }

    /// Validate one symbol.
    ///
    /// Fresh history wins. A source error falls back to `cached`; with
    /// neither available the status is `UNKNOWN`.
    pub fn validate(
        &self,
        symbol: &str,
        cached: Option<&SymbolSignal>,
        validated_at: NaiveDateTime,
    ) -> ValidationResult {
        let fresh = match self.source {
            Some(source) => match source.symbol_history(symbol, self.history_days) {
                Ok(history) => Some(history),
                Err(e) => {
                    warn!(symbol, error = %e, "history unavailable, using cached signal");
                    None
                }
            },
            None => None,
        };

        let (metrics, data_source) = match (fresh, cached) {
            (Some(history), _) => {
                match ValidationMetrics::from_history(&history, self.history_days) {
                    Ok(m) => (m, ValidationSource::History),
                    Err(e) => {
                        warn!(symbol, error = %e, "classification failed");
                        return ValidationResult {
                            symbol: symbol.to_string(),
                            status: ValidationStatus::Error,
                            reason: format!("validation failed: {e}"),
                            last_price: None,
                            avg_volume: None,
                            data_source: ValidationSource::History,
                            validated_at,
                        };
                    }
                }
            }
            (None, Some(signal)) => (
                ValidationMetrics::from_signal(signal),
                ValidationSource::CachedSignal,
            ),
            (None, None) => {
                return ValidationResult {
                    symbol: symbol.to_string(),
                    status: ValidationStatus::Unknown,
                    reason: "no history source or cached signal".to_string(),
                    last_price: None,
                    avg_volume: None,
                    data_source: ValidationSource::None,
                    validated_at,
                };
            }
        };

        let (status, reason) = classify(&metrics, &self.thresholds);
        debug!(symbol, %status, ?data_source, "validated");
        ValidationResult {
            symbol: symbol.to_string(),
            status,
            reason,
            last_price: metrics.has_data.then_some(metrics.latest_price),
            avg_volume: metrics.has_data.then_some(metrics.avg_volume),
            data_source,
            validated_at,
        }
    }

    /// Validate every confirmed signal, in order. One bad symbol never stops the batch.
    pub fn validate_all(
        &self,
        confirmed: &[ConfirmedSignal],
        validated_at: NaiveDateTime,
    ) -> Vec<ValidationResult> {
        confirmed
            .iter()
            .map(|c| self.validate(&c.signal.symbol, Some(&c.signal), validated_at))
            .collect()
    }
}

/// Count of results per status.
pub fn summarize(results: &[ValidationResult]) -> BTreeMap<ValidationStatus, usize> {
    let mut counts = BTreeMap::new();
    for r in results {
        *counts.entry(r.status).or_insert(0) += 1;
    }
    counts
}
