//! Data sources: price history, symbol universe, and the detection window

pub mod csv_import;
pub mod memory;
pub mod parquet;
pub mod provider;
pub mod universe;
pub mod window;

pub use csv_import::load_csv;
pub use memory::InMemoryHistory;
pub use parquet::load_parquet;
pub use provider::{PriceHistorySource, SourceError, SymbolUniverse};
pub use universe::Watchlist;
pub use window::HistoryWindow;

use std::path::Path;

/// Open a history file, picking the loader from the extension (`.csv` or parquet).
pub fn open_history(path: &Path) -> Result<InMemoryHistory, SourceError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => load_csv(path),
        _ => load_parquet(path),
    }
}
