//! PriceObservation: one close/volume print for one symbol on one trading date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Symbol;

/// Close and volume for a single symbol on a single trading date.
///
/// Supplied by the history source, ordered ascending by date, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
}

impl PriceObservation {
    pub fn new(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self {
            date,
            close,
            volume,
        }
    }

    /// True if the close is a usable price (finite and non-negative).
    pub fn is_sane(&self) -> bool {
        self.close.is_finite() && self.close >= 0.0
    }

    pub fn is_zero_volume(&self) -> bool {
        self.volume == 0
    }
}

/// A symbol-tagged observation, as returned by range queries on the history source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub symbol: Symbol,
    #[serde(flatten)]
    pub observation: PriceObservation,
}

impl PriceRow {
    pub fn new(symbol: impl Into<Symbol>, date: NaiveDate, close: f64, volume: u64) -> Self {
        Self {
            symbol: symbol.into(),
            observation: PriceObservation::new(date, close, volume),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PriceObservation {
        PriceObservation::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 12.5, 1_000)
    }

    #[test]
    fn observation_is_sane() {
        assert!(sample().is_sane());
    }

    #[test]
    fn observation_detects_nan_and_negative() {
        let mut obs = sample();
        obs.close = f64::NAN;
        assert!(!obs.is_sane());
        obs.close = -0.5;
        assert!(!obs.is_sane());
    }

    #[test]
    fn zero_price_is_still_sane() {
        let mut obs = sample();
        obs.close = 0.0;
        assert!(obs.is_sane());
    }

    #[test]
    fn row_serializes_flat() {
        let row = PriceRow::new("ABC", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 1.0, 0);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["symbol"], "ABC");
        assert_eq!(json["date"], "2024-01-02");
        assert_eq!(json["volume"], 0);
    }
}
