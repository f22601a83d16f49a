//! Persisted confirmation state.
//!
//! One `TrackingEntry` per symbol that has ever been flagged. Entries are
//! zeroed on recovery, never removed, so the key set only grows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Symbol;

/// Reason stored on an entry whose symbol was not flagged on the latest run.
pub const RECOVERED_REASON: &str = "recovered";

/// Failure tracking for a single symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    /// Consecutive eligible runs on which the symbol was flagged.
    pub count: u32,
    /// Run date the symbol was first flagged. Set once, kept through resets.
    #[serde(default)]
    pub first_flagged: Option<NaiveDate>,
    /// Joined reasons from the latest flag, or [`RECOVERED_REASON`].
    #[serde(default)]
    pub reason: String,
}

impl TrackingEntry {
    pub fn is_failing(&self) -> bool {
        self.count > 0
    }

    pub fn is_recovered(&self) -> bool {
        self.count == 0 && self.reason == RECOVERED_REASON
    }
}

/// The whole store: last run date and the per-symbol entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    #[serde(default)]
    pub last_run: Option<NaiveDate>,
    #[serde(default)]
    pub failure_counts: BTreeMap<Symbol, TrackingEntry>,
}

impl TrackingState {
    pub fn get(&self, symbol: &str) -> Option<&TrackingEntry> {
        self.failure_counts.get(symbol)
    }

    /// Current count for a symbol, 0 if never tracked.
    pub fn count(&self, symbol: &str) -> u32 {
        self.get(symbol).map_or(0, |e| e.count)
    }

    pub fn len(&self) -> usize {
        self.failure_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failure_counts.is_empty()
    }

    /// Symbols with a non-zero count, highest count first.
    pub fn failing(&self) -> Vec<(&str, &TrackingEntry)> {
        let mut failing: Vec<(&str, &TrackingEntry)> = self
            .failure_counts
            .iter()
            .filter(|(_, e)| e.is_failing())
            .map(|(s, e)| (s.as_str(), e))
            .collect();
        failing.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        failing
    }

    /// Number of symbols at or above the confirmation bar.
    pub fn confirmed_count(&self, required: u32) -> usize {
        self.failure_counts
            .values()
            .filter(|e| e.count >= required)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(count: u32, reason: &str) -> TrackingEntry {
        TrackingEntry {
            count,
            first_flagged: NaiveDate::from_ymd_opt(2024, 3, 4),
            reason: reason.into(),
        }
    }

    #[test]
    fn default_state_is_empty() {
        let state = TrackingState::default();
        assert!(state.is_empty());
        assert_eq!(state.last_run, None);
        assert_eq!(state.count("ABC"), 0);
    }

    #[test]
    fn failing_sorted_by_count_desc() {
        let mut state = TrackingState::default();
        state.failure_counts.insert("AAA".into(), entry(1, "stale"));
        state.failure_counts.insert("BBB".into(), entry(4, "penny"));
        state
            .failure_counts
            .insert("CCC".into(), entry(0, RECOVERED_REASON));

        let failing = state.failing();
        assert_eq!(failing.len(), 2);
        assert_eq!(failing[0].0, "BBB");
        assert_eq!(failing[1].0, "AAA");
        assert_eq!(state.confirmed_count(3), 1);
    }

    #[test]
    fn deserializes_without_optional_fields() {
        let json = r#"{"failure_counts":{"XYZ":{"count":2}}}"#;
        let state: TrackingState = serde_json::from_str(json).unwrap();
        assert_eq!(state.last_run, None);
        assert_eq!(state.count("XYZ"), 2);
        assert_eq!(state.get("XYZ").unwrap().first_flagged, None);
    }

    #[test]
    fn recovered_entry_flags() {
        assert!(entry(0, RECOVERED_REASON).is_recovered());
        assert!(!entry(2, "stale").is_recovered());
    }
}
