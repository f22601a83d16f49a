//! Confirmation engine: folds a run's signals into the tracking state.
//!
//! A symbol only becomes actionable after it has been flagged on
//! `required_failures` consecutive eligible runs. The merge is a pure
//! function of (signals, prior state, today); [`ConfirmationEngine::run`]
//! wraps it with load and save so the increment is always recomputed from
//! the last durable state. A run killed before `save` leaves the old state in
//! place and the retry counts once.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::domain::{ConfirmedSignal, SymbolSignal, TrackingEntry, TrackingState, RECOVERED_REASON};
use crate::state::{StateError, StateStore};

/// Default number of consecutive flagged runs before a symbol is confirmed.
pub const DEFAULT_REQUIRED_FAILURES: u32 = 3;

/// Output of one merge.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationResult {
    /// Signals whose new count reached the bar, in input order.
    pub confirmed: Vec<ConfirmedSignal>,
    /// The state to persist.
    pub state: TrackingState,
    /// Symbols flagged for the first time (no prior entry).
    pub newly_tracked: Vec<String>,
    /// Symbols whose non-zero count was reset this run.
    pub recovered: Vec<String>,
}

/// Merge today's signals into the prior state.
pub fn merge(
    signals: &[SymbolSignal],
    prior: &TrackingState,
    today: NaiveDate,
    required_failures: u32,
) -> ConfirmationResult {
    let mut failure_counts = prior.failure_counts.clone();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut newly_tracked = Vec::new();
    let mut confirmed = Vec::new();

    for signal in signals {
        if !seen.insert(signal.symbol.as_str()) {
            debug!(symbol = %signal.symbol, "duplicate signal ignored");
            continue;
        }

        let previous = prior.get(&signal.symbol);
        if previous.is_none() {
            newly_tracked.push(signal.symbol.clone());
        }
        let count = previous.map_or(0, |e| e.count) + 1;
        let first_flagged = previous.and_then(|e| e.first_flagged).unwrap_or(today);

        failure_counts.insert(
            signal.symbol.clone(),
            TrackingEntry {
                count,
                first_flagged: Some(first_flagged),
                reason: signal.reason_text(),
            },
        );

        if count >= required_failures {
            confirmed.push(ConfirmedSignal {
                signal: signal.clone(),
                failure_count: count,
                first_flagged,
            });
        }
    }

    let mut recovered = Vec::new();
    for (symbol, entry) in failure_counts.iter_mut() {
        if seen.contains(symbol.as_str()) {
            continue;
        }
        if entry.count > 0 {
            recovered.push(symbol.clone());
        }
        entry.count = 0;
        entry.reason = RECOVERED_REASON.to_string();
    }

    ConfirmationResult {
        confirmed,
        state: TrackingState {
            last_run: Some(today),
            failure_counts,
        },
        newly_tracked,
        recovered,
    }
}

/// Confirmation with persistence.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationEngine {
    required_failures: u32,
}

impl Default for ConfirmationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_FAILURES)
    }
}

impl ConfirmationEngine {
    pub fn new(required_failures: u32) -> Self {
        Self { required_failures }
    }

    pub fn required_failures(&self) -> u32 {
        self.required_failures
    }

    /// Load prior state, merge, persist, then return.
    ///
    /// A save failure is returned as an error and nothing is confirmed.
    pub fn run(
        &self,
        store: &dyn StateStore,
        signals: &[SymbolSignal],
        today: NaiveDate,
    ) -> Result<ConfirmationResult, StateError> {
        let prior = store.load();
        let result = merge(signals, &prior, today, self.required_failures);
        store.save(&result.state)?;

        info!(
            %today,
            flagged = signals.len(),
            confirmed = result.confirmed.len(),
            new = result.newly_tracked.len(),
            recovered = result.recovered.len(),
            required = self.required_failures,
            "confirmation state updated"
        );
        Ok(result)
    }
}
