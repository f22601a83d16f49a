//! CSV history loader (same long format as the parquet loader).

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use super::memory::InMemoryHistory;
use super::provider::SourceError;
use crate::domain::PriceObservation;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Symbol", alias = "SYMBOL")]
    symbol: String,
    #[serde(alias = "Date", alias = "DATE")]
    date: NaiveDate,
    #[serde(alias = "Close", alias = "CLOSE")]
    close: f64,
    #[serde(alias = "Volume", alias = "VOLUME", default)]
    volume: f64,
}

/// Load a CSV file with a header row into an in-memory history.
pub fn load_csv(path: &Path) -> Result<InMemoryHistory, SourceError> {
    let path_display = path.display().to_string();
    if !path.exists() {
        return Err(SourceError::MissingSource(path_display));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| SourceError::Read {
        path: path_display.clone(),
        reason: e.to_string(),
    })?;

    let mut history = InMemoryHistory::new(path_display.clone());
    let mut skipped = 0usize;

    for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                debug!(path = %path_display, row = line + 1, error = %e, "unparseable csv row");
                skipped += 1;
                continue;
            }
        };
        let obs = PriceObservation::new(row.date, row.close, row.volume.max(0.0).round() as u64);
        if !obs.is_sane() || row.symbol.trim().is_empty() {
            skipped += 1;
            continue;
        }
        history.insert(&row.symbol, obs);
    }

    if skipped > 0 {
        warn!(path = %path_display, skipped, "skipped unusable csv rows");
    }
    debug!(
        path = %path_display,
        rows = history.len(),
        symbols = history.symbol_count(),
        "loaded csv history"
    );

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::PriceHistorySource;
    use tempfile::TempDir;

    #[test]
    fn loads_csv_with_capitalized_headers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("daily.csv");
        std::fs::write(
            &path,
            "symbol,Date,Close,Volume\nabc,2024-01-02,1.25,100\nABC,2024-01-03,1.25,0\nXYZ,2024-01-03,-1,5\n",
        )
        .unwrap();

        let history = load_csv(&path).unwrap();
        assert_eq!(history.symbol_count(), 1);
        let obs = history.symbol_history("ABC", 5).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].volume, 100);
    }

    #[test]
    fn unparseable_rows_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("daily.csv");
        std::fs::write(
            &path,
            "symbol,date,close,volume\n\
             AAA,2024-01-02,5.0,100\n\
             BBB,2024-01-02,,100\n\
             CCC,not-a-date,1.0,1\n\
             CCC,2024-01-02,7.5,200\n",
        )
        .unwrap();

        let history = load_csv(&path).unwrap();
        assert_eq!(history.symbol_count(), 2);
        assert_eq!(history.symbol_history("AAA", 5).unwrap().len(), 1);
        assert_eq!(history.symbol_history("CCC", 5).unwrap()[0].close, 7.5);
        assert!(history.symbol_history("BBB", 5).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_missing_source() {
        let tmp = TempDir::new().unwrap();
        assert!(load_csv(&tmp.path().join("nope.csv")).unwrap_err().is_missing());
    }
}
