//! Per-run detection output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Symbol;
use crate::rules::RiskTier;

/// Which branch of detection produced a signal.
///
/// No-data classes short-circuit the price checks, so a no-data signal never
/// carries stale or penny flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalClass {
    /// In the universe, but no observations anywhere in the window.
    Absent,
    /// Has observations, but the feed stopped `gap_days` trading days ago
    /// while the rest of the dataset kept updating.
    FeedStopped { gap_days: usize },
    /// Stale and/or penny conditions on a live feed.
    Flagged,
}

impl SignalClass {
    pub fn is_no_data(&self) -> bool {
        !matches!(self, SignalClass::Flagged)
    }
}

/// Signal set for one symbol from one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSignal {
    pub symbol: Symbol,
    pub class: SignalClass,
    pub latest_close: f64,
    /// Date of the most recent observation, `None` when absent.
    pub last_date: Option<NaiveDate>,
    pub max_consecutive: usize,
    pub avg_volume: f64,
    pub zero_volume_days: usize,
    pub is_penny: bool,
    pub is_extreme_penny: bool,
    pub is_stale: bool,
    pub is_no_data: bool,
    pub risk: RiskTier,
    /// Human-readable justification, never empty.
    pub reasons: Vec<String>,
}

impl SymbolSignal {
    /// Reasons joined into the single string stored in tracking state.
    pub fn reason_text(&self) -> String {
        self.reasons.join("; ")
    }
}

/// A signal that has failed on enough consecutive runs to be actionable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedSignal {
    #[serde(flatten)]
    pub signal: SymbolSignal,
    pub failure_count: u32,
    pub first_flagged: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_classes() {
        assert!(SignalClass::Absent.is_no_data());
        assert!(SignalClass::FeedStopped { gap_days: 6 }.is_no_data());
        assert!(!SignalClass::Flagged.is_no_data());
    }

    #[test]
    fn class_serializes_tagged() {
        let json = serde_json::to_value(SignalClass::FeedStopped { gap_days: 7 }).unwrap();
        assert_eq!(json["kind"], "FEED_STOPPED");
        assert_eq!(json["gap_days"], 7);
    }
}
