//! The recent-history window the detection engine scans.
//!
//! A window is the last `k` distinct trading dates in the whole dataset plus
//! every row on or after the oldest of them, grouped per symbol and sorted
//! ascending by date.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::provider::{PriceHistorySource, SourceError};
use crate::domain::{normalize_symbol, PriceObservation, PriceRow, Symbol};

/// Recent trading dates plus per-symbol observations within them.
#[derive(Debug, Clone, Default)]
pub struct HistoryWindow {
    dates: Vec<NaiveDate>,
    series: BTreeMap<Symbol, Vec<PriceObservation>>,
}

impl HistoryWindow {
    /// Pull a `window_days`-date window from a history source.
    pub fn load(
        source: &dyn PriceHistorySource,
        window_days: usize,
    ) -> Result<Self, SourceError> {
        let dates = source.recent_trading_dates(window_days)?;
        let Some(oldest) = dates.first().copied() else {
            return Ok(Self::default());
        };
        let rows = source.rows_since(oldest)?;
        Ok(Self::from_parts(dates, rows))
    }

    /// Build a window directly from rows, keeping the last `window_days` dates.
    pub fn from_rows(rows: Vec<PriceRow>, window_days: usize) -> Self {
        let mut dates: Vec<NaiveDate> = rows.iter().map(|r| r.observation.date).collect();
        dates.sort();
        dates.dedup();
        let skip = dates.len().saturating_sub(window_days);
        let dates = dates.split_off(skip);
        Self::from_parts(dates, rows)
    }

    fn from_parts(dates: Vec<NaiveDate>, rows: Vec<PriceRow>) -> Self {
        let oldest = dates.first().copied();
        let mut series: BTreeMap<Symbol, Vec<PriceObservation>> = BTreeMap::new();
        for row in rows {
            if oldest.map_or(true, |o| row.observation.date < o) {
                continue;
            }
            series
                .entry(normalize_symbol(&row.symbol))
                .or_default()
                .push(row.observation);
        }
        for obs in series.values_mut() {
            obs.sort_by_key(|o| o.date);
            obs.dedup_by_key(|o| o.date);
        }
        Self { dates, series }
    }

    /// Distinct trading dates in the window, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn distinct_dates(&self) -> usize {
        self.dates.len()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// The `n`th-most-recent distinct date (1 = latest).
    pub fn nth_most_recent(&self, n: usize) -> Option<NaiveDate> {
        if n == 0 || n > self.dates.len() {
            return None;
        }
        Some(self.dates[self.dates.len() - n])
    }

    /// Number of window dates strictly after `date`.
    pub fn trading_days_after(&self, date: NaiveDate) -> usize {
        self.dates.iter().filter(|d| **d > date).count()
    }

    pub fn series(&self, symbol: &str) -> Option<&[PriceObservation]> {
        self.series.get(symbol).map(|v| v.as_slice())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }

    pub fn row_count(&self) -> usize {
        self.series.values().map(|v| v.len()).sum()
    }

    /// Per-symbol series in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PriceObservation])> {
        self.series.iter().map(|(s, o)| (s.as_str(), o.as_slice()))
    }
}
