//! SQL cleanup script for delisted symbols.
//!
//! The script backs the rows up and leaves the `DELETE` commented out; an
//! operator has to uncomment it after reviewing the backup.

use chrono::NaiveDateTime;

/// Render the script, or `None` when there is nothing to clean up.
pub fn render_cleanup_sql(symbols: &[String], generated_at: NaiveDateTime) -> Option<String> {
    if symbols.is_empty() {
        return None;
    }
    let list = symbols
        .iter()
        .map(|s| format!("'{}'", s.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ");

    Some(format!(
        "-- Database Cleanup Script
-- Generated: {generated}
-- CAUTION: Review before executing

-- Backup delisted securities data before removal
CREATE TABLE IF NOT EXISTS deleted_securities_backup AS
SELECT * FROM daily_prices WHERE symbol IN ({list});

-- Remove delisted securities from main table
-- DELETE FROM daily_prices WHERE symbol IN ({list});

-- Note: Uncomment the DELETE statement above after reviewing the backup

-- Statistics after cleanup:
-- SELECT COUNT(*) as remaining_records FROM daily_prices;
-- SELECT COUNT(DISTINCT symbol) as remaining_securities FROM daily_prices;
",
        generated = generated_at.format("%Y-%m-%d %H:%M:%S"),
    ))
}
