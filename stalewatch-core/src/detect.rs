//! Detection engine: scans the recent window and emits per-symbol signals.
//!
//! Per run:
//! 1. Gate: weekend runs and windows with fewer than [`MIN_TRADING_DATES`]
//!    distinct dates produce no signals (not an error).
//! 2. Feed-stopped symbols (last print older than the 5th-most-recent date in
//!    the whole dataset) and universe symbols absent from the window become
//!    no-data signals. These skip every price check.
//! 3. Every other symbol with at least [`MIN_OBSERVATIONS`] prints is scored
//!    for stale runs, penny prices and zero-volume days. Only stale or penny
//!    symbols produce a signal.
//! 4. Signals are ordered HIGH → LOW, then by average volume ascending.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::calendar::is_business_day;
use crate::data::HistoryWindow;
use crate::domain::{PriceObservation, SignalClass, Symbol, SymbolSignal};
use crate::rules::{assess_risk, longest_same_price_run, RiskFactors, RiskTier, Thresholds};

/// Fewer distinct dates than this in the dataset means "insufficient history".
pub const MIN_TRADING_DATES: usize = 5;

/// Symbols with fewer observations in the window are not scored.
pub const MIN_OBSERVATIONS: usize = 5;

/// A symbol whose last print predates the Nth-most-recent date has stopped updating.
pub const FEED_STOP_LOOKBACK: usize = 5;

/// Reason attached to universe symbols with nothing in the window.
pub const ABSENT_REASON: &str = "no recent data (possibly delisted)";

/// Result of one detection pass.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    /// Saturday or Sunday: nothing scanned, state must not be touched.
    NonBusinessDay,
    /// The dataset holds fewer than [`MIN_TRADING_DATES`] distinct dates.
    InsufficientHistory { distinct_dates: usize },
    /// Pre-confirmation signals in report order.
    Detected(Vec<SymbolSignal>),
}

impl DetectionOutcome {
    /// Whether this run counts toward confirmation.
    pub fn is_eligible(&self) -> bool {
        matches!(self, DetectionOutcome::Detected(_))
    }

    pub fn signals(&self) -> &[SymbolSignal] {
        match self {
            DetectionOutcome::Detected(signals) => signals,
            _ => &[],
        }
    }

    pub fn into_signals(self) -> Vec<SymbolSignal> {
        match self {
            DetectionOutcome::Detected(signals) => signals,
            _ => Vec::new(),
        }
    }
}

/// Stale / penny / no-data detector.
#[derive(Debug, Clone, Default)]
pub struct DetectionEngine {
    thresholds: Thresholds,
}

impl DetectionEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Scan a window against the universe.
    pub fn detect(
        &self,
        today: NaiveDate,
        window: &HistoryWindow,
        universe: &BTreeSet<Symbol>,
    ) -> DetectionOutcome {
        if !is_business_day(today) {
            info!(%today, "not a business day, skipping detection");
            return DetectionOutcome::NonBusinessDay;
        }

        let Some(cutoff) = window
            .nth_most_recent(FEED_STOP_LOOKBACK)
            .filter(|_| window.distinct_dates() >= MIN_TRADING_DATES)
        else {
            info!(
                distinct_dates = window.distinct_dates(),
                required = MIN_TRADING_DATES,
                "insufficient history, skipping detection"
            );
            return DetectionOutcome::InsufficientHistory {
                distinct_dates: window.distinct_dates(),
            };
        };

        let mut signals = Vec::new();

        for (symbol, observations) in window.iter() {
            let Some(last) = observations.last() else {
                continue;
            };
            if last.date < cutoff {
                let gap_days = window.trading_days_after(last.date);
                signals.push(feed_stopped_signal(symbol, last, gap_days));
                continue;
            }
            if let Some(signal) = self.analyze_symbol(symbol, observations) {
                signals.push(signal);
            }
        }

        for symbol in universe.iter().filter(|s| !window.contains(s)) {
            signals.push(absent_signal(symbol));
        }

        sort_signals(&mut signals);

        info!(
            symbols = window.symbol_count(),
            universe = universe.len(),
            flagged = signals.len(),
            "detection complete"
        );
        DetectionOutcome::Detected(signals)
    }

    /// Score one live symbol. Returns `None` when it is neither stale nor penny
    /// or has too few observations to judge.
    pub fn analyze_symbol(
        &self,
        symbol: &str,
        observations: &[PriceObservation],
    ) -> Option<SymbolSignal> {
        if observations.len() < MIN_OBSERVATIONS {
            debug!(symbol, observations = observations.len(), "too few observations");
            return None;
        }
        let t = &self.thresholds;
        let last = observations.last()?;

        let closes: Vec<f64> = observations.iter().map(|o| o.close).collect();
        let run = longest_same_price_run(&closes);
        let is_stale = run.len >= t.stale_days;

        let latest_close = last.close;
        let is_extreme_penny = latest_close < t.extreme_penny_price;
        let is_penny = is_extreme_penny || latest_close < t.penny_price;

        if !is_stale && !is_penny {
            return None;
        }

        let zero_volume_days = observations.iter().filter(|o| o.is_zero_volume()).count();
        let avg_volume =
            observations.iter().map(|o| o.volume as f64).sum::<f64>() / observations.len() as f64;

        let risk = assess_risk(
            &RiskFactors {
                is_penny,
                is_extreme_penny,
                is_stale,
                avg_volume,
                zero_volume_days,
            },
            t,
        );

        let mut reasons = Vec::with_capacity(3);
        if is_extreme_penny {
            reasons.push(format!(
                "extreme penny stock: ${latest_close:.4} < ${:.2}",
                t.extreme_penny_price
            ));
        } else if is_penny {
            reasons.push(format!(
                "penny stock: ${latest_close:.4} < ${:.2}",
                t.penny_price
            ));
        }
        if is_stale {
            reasons.push(format!(
                "price unchanged for {} consecutive days at ${:.4}",
                run.len, closes[run.start]
            ));
        }
        if zero_volume_days >= t.zero_volume_alert_days {
            reasons.push(format!("{zero_volume_days} zero-volume days in window"));
        }

        Some(SymbolSignal {
            symbol: symbol.to_string(),
            class: SignalClass::Flagged,
            latest_close,
            last_date: Some(last.date),
            max_consecutive: run.len,
            avg_volume,
            zero_volume_days,
            is_penny,
            is_extreme_penny,
            is_stale,
            is_no_data: false,
            risk,
            reasons,
        })
    }
}

fn absent_signal(symbol: &str) -> SymbolSignal {
    SymbolSignal {
        symbol: symbol.to_string(),
        class: SignalClass::Absent,
        latest_close: 0.0,
        last_date: None,
        max_consecutive: 0,
        avg_volume: 0.0,
        zero_volume_days: 0,
        is_penny: false,
        is_extreme_penny: false,
        is_stale: false,
        is_no_data: true,
        risk: RiskTier::High,
        reasons: vec![ABSENT_REASON.to_string()],
    }
}

fn feed_stopped_signal(symbol: &str, last: &PriceObservation, gap_days: usize) -> SymbolSignal {
    SymbolSignal {
        symbol: symbol.to_string(),
        class: SignalClass::FeedStopped { gap_days },
        latest_close: last.close,
        last_date: Some(last.date),
        max_consecutive: 0,
        avg_volume: last.volume as f64,
        zero_volume_days: 0,
        is_penny: false,
        is_extreme_penny: false,
        is_stale: false,
        is_no_data: true,
        risk: RiskTier::High,
        reasons: vec![format!(
            "no data for {gap_days} trading days (last seen {})",
            last.date
        )],
    }
}

/// Report order: risk tier, then average volume ascending; no-data first on
/// ties, then symbol for determinism.
pub fn sort_signals(signals: &mut [SymbolSignal]) {
    signals.sort_by(|a, b| {
        a.risk
            .cmp(&b.risk)
            .then_with(|| a.avg_volume.total_cmp(&b.avg_volume))
            .then_with(|| b.is_no_data.cmp(&a.is_no_data))
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

/// Per-category counts over a signal list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub total_flagged: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub low_risk: usize,
    pub no_data: usize,
    pub penny: usize,
    pub extreme_penny: usize,
    pub stale: usize,
}

impl DetectionSummary {
    pub fn from_signals(signals: &[SymbolSignal]) -> Self {
        let mut s = Self {
            total_flagged: signals.len(),
            ..Self::default()
        };
        for sig in signals {
            match sig.risk {
                RiskTier::High => s.high_risk += 1,
                RiskTier::Medium => s.medium_risk += 1,
                RiskTier::Low => s.low_risk += 1,
            }
            s.no_data += sig.is_no_data as usize;
            s.penny += sig.is_penny as usize;
            s.extreme_penny += sig.is_extreme_penny as usize;
            s.stale += sig.is_stale as usize;
        }
        s
    }
}
