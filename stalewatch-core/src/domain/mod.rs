//! Domain types for StaleWatch

pub mod observation;
pub mod signal;
pub mod tracking;

pub use observation::{PriceObservation, PriceRow};
pub use signal::{ConfirmedSignal, SignalClass, SymbolSignal};
pub use tracking::{TrackingEntry, TrackingState, RECOVERED_REASON};

/// Symbol type alias
pub type Symbol = String;

/// Canonical symbol form: trimmed, uppercase.
pub fn normalize_symbol(raw: &str) -> Symbol {
    raw.trim().to_ascii_uppercase()
}
