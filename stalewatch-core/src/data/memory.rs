//! In-memory price history, the common target of every loader.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::provider::{PriceHistorySource, SourceError};
use crate::domain::{normalize_symbol, PriceObservation, PriceRow, Symbol};

/// Price history indexed by symbol, then date.
///
/// Inserting a second row for the same (symbol, date) replaces the first.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    name: String,
    series: BTreeMap<Symbol, BTreeMap<NaiveDate, PriceObservation>>,
}

impl InMemoryHistory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            series: BTreeMap::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, rows: impl IntoIterator<Item = PriceRow>) -> Self {
        let mut history = Self::new(name);
        for row in rows {
            history.insert(&row.symbol, row.observation);
        }
        history
    }

    pub fn insert(&mut self, symbol: &str, observation: PriceObservation) {
        self.series
            .entry(normalize_symbol(symbol))
            .or_default()
            .insert(observation.date, observation);
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.series.values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }

    fn all_dates(&self) -> BTreeSet<NaiveDate> {
        self.series
            .values()
            .flat_map(|s| s.keys().copied())
            .collect()
    }
}

impl PriceHistorySource for InMemoryHistory {
    fn name(&self) -> &str {
        &self.name
    }

    fn recent_trading_dates(&self, k: usize) -> Result<Vec<NaiveDate>, SourceError> {
        let dates = self.all_dates();
        let skip = dates.len().saturating_sub(k);
        Ok(dates.into_iter().skip(skip).collect())
    }

    fn rows_since(&self, since: NaiveDate) -> Result<Vec<PriceRow>, SourceError> {
        let rows = self
            .series
            .iter()
            .flat_map(|(symbol, obs)| {
                obs.range(since..).map(move |(_, o)| PriceRow {
                    symbol: symbol.clone(),
                    observation: *o,
                })
            })
            .collect();
        Ok(rows)
    }

    fn symbol_history(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<PriceObservation>, SourceError> {
        let Some(obs) = self.series.get(&normalize_symbol(symbol)) else {
            return Ok(Vec::new());
        };
        let skip = obs.len().saturating_sub(limit);
        Ok(obs.values().skip(skip).copied().collect())
    }
}
