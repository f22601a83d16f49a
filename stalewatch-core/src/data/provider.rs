//! Source traits and structured error types.
//!
//! The history and universe traits abstract over where data lives (parquet
//! dump, CSV export, in-memory fixture) so the engines never touch I/O and
//! tests can swap in fixtures.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::domain::{PriceObservation, PriceRow, Symbol};

/// Structured error types for source reads.
///
/// None of these abort a run: the pipeline maps them to an empty result for
/// the stage that needed the source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    MissingSource(String),

    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("malformed data in {path}: {reason}")]
    Parse { path: String, reason: String },
}

impl SourceError {
    pub fn is_missing(&self) -> bool {
        matches!(self, SourceError::MissingSource(_))
    }
}

/// Read-only access to daily price history across all symbols.
pub trait PriceHistorySource: Send + Sync {
    /// Human-readable name of this source (file path, fixture name).
    fn name(&self) -> &str;

    /// The most recent `k` distinct trading dates in the dataset, ascending.
    fn recent_trading_dates(&self, k: usize) -> Result<Vec<NaiveDate>, SourceError>;

    /// Every symbol×date row on or after `since`.
    fn rows_since(&self, since: NaiveDate) -> Result<Vec<PriceRow>, SourceError>;

    /// The most recent `limit` observations for one symbol, ascending by date.
    /// Unknown symbols yield an empty vector, not an error.
    fn symbol_history(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<PriceObservation>, SourceError>;
}

/// The set of symbols that are expected to have data.
pub trait SymbolUniverse {
    fn symbols(&self) -> Result<BTreeSet<Symbol>, SourceError>;
}
