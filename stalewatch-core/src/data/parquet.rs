//! Parquet history loader.
//!
//! Expects a long-format daily table with `symbol`, `date`, `close` and
//! `volume` columns. Column names are matched case-insensitively so dumps
//! with `Date`/`Close`/`Volume` headers load unchanged. Rows with an unusable
//! close (NaN, negative) or a null key are skipped with a warning.

use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::memory::InMemoryHistory;
use super::provider::SourceError;
use crate::domain::PriceObservation;

const REQUIRED_COLUMNS: [&str; 4] = ["symbol", "date", "close", "volume"];

/// Load a parquet file into an in-memory history.
pub fn load_parquet(path: &Path) -> Result<InMemoryHistory, SourceError> {
    let path_display = path.display().to_string();
    if !path.exists() {
        return Err(SourceError::MissingSource(path_display));
    }

    let file = fs::File::open(path).map_err(|e| SourceError::Read {
        path: path_display.clone(),
        reason: e.to_string(),
    })?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| SourceError::Read {
            path: path_display.clone(),
            reason: e.to_string(),
        })?;

    let history = dataframe_to_history(&df, &path_display)?;
    debug!(
        path = %path_display,
        rows = history.len(),
        symbols = history.symbol_count(),
        "loaded parquet history"
    );
    Ok(history)
}

/// Resolve a required column regardless of header case.
fn find_column<'a>(df: &'a DataFrame, wanted: &str, path: &str) -> Result<&'a Column, SourceError> {
    let name = df
        .get_column_names()
        .into_iter()
        .find(|n| n.as_str().eq_ignore_ascii_case(wanted))
        .cloned()
        .ok_or_else(|| SourceError::Parse {
            path: path.to_string(),
            reason: format!("missing column '{wanted}'"),
        })?;
    df.column(name.as_str()).map_err(|e| SourceError::Parse {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn dataframe_to_history(df: &DataFrame, path: &str) -> Result<InMemoryHistory, SourceError> {
    let parse_err = |e: PolarsError| SourceError::Parse {
        path: path.to_string(),
        reason: e.to_string(),
    };

    let columns = REQUIRED_COLUMNS
        .iter()
        .map(|c| find_column(df, c, path))
        .collect::<Result<Vec<_>, _>>()?;

    let symbols = columns[0].str().map_err(parse_err)?;
    let dates = columns[1].cast(&DataType::Date).map_err(parse_err)?;
    let date_ca = dates.date().map_err(parse_err)?;
    let closes = columns[2].cast(&DataType::Float64).map_err(parse_err)?;
    let close_ca = closes.f64().map_err(parse_err)?;
    let volumes = columns[3].cast(&DataType::Float64).map_err(parse_err)?;
    let vol_ca = volumes.f64().map_err(parse_err)?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).ok_or_else(|| SourceError::Parse {
        path: path.to_string(),
        reason: "invalid epoch".into(),
    })?;

    let mut history = InMemoryHistory::new(path);
    let mut skipped = 0usize;

    for i in 0..df.height() {
        let (Some(symbol), Some(days), Some(close)) = (symbols.get(i), date_ca.get(i), close_ca.get(i))
        else {
            skipped += 1;
            continue;
        };
        let date = epoch + chrono::Duration::days(days as i64);
        let volume = vol_ca.get(i).unwrap_or(0.0).max(0.0).round() as u64;
        let obs = PriceObservation::new(date, close, volume);
        if !obs.is_sane() {
            skipped += 1;
            continue;
        }
        history.insert(symbol, obs);
    }

    if skipped > 0 {
        warn!(path, skipped, "skipped unusable parquet rows");
    }

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::PriceHistorySource;
    use tempfile::TempDir;

    fn write_fixture(path: &Path) {
        let days: Vec<i32> = (0..3)
            .map(|d| {
                (NaiveDate::from_ymd_opt(2024, 1, 2 + d).unwrap()
                    - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
                .num_days() as i32
            })
            .collect();
        let mut df = DataFrame::new(vec![
            Column::new("symbol".into(), vec!["ABC", "ABC", "XYZ"]),
            Column::new("Date".into(), days)
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("Close".into(), vec![1.5, 1.5, f64::NAN]),
            Column::new("Volume".into(), vec![100i64, 0, 50]),
        ])
        .unwrap();
        let file = fs::File::create(path).unwrap();
        ParquetWriter::new(file).finish(&mut df).unwrap();
    }

    #[test]
    fn loads_parquet_with_mixed_case_headers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("daily.parquet");
        write_fixture(&path);

        let history = load_parquet(&path).unwrap();
        // XYZ's only row has a NaN close and is skipped
        assert_eq!(history.symbol_count(), 1);
        let obs = history.symbol_history("ABC", 10).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[1].volume, 0);
        assert_eq!(obs[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn missing_file_is_missing_source() {
        let tmp = TempDir::new().unwrap();
        let err = load_parquet(&tmp.path().join("nope.parquet")).unwrap_err();
        assert!(err.is_missing());
    }
}
