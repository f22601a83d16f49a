//! StaleWatch Core: data-quality detection for a tracked securities universe.
//!
//! This crate contains the engine:
//! - Domain types (observations, signals, tracking state)
//! - Shared rule tables (price tolerance, thresholds, risk tiers)
//! - Price history and symbol universe sources (parquet, CSV, in-memory, watchlists)
//! - Detection engine (stale runs, penny flags, no-data)
//! - Confirmation engine with its persisted state store
//! - Validation classifier

pub mod calendar;
pub mod confirm;
pub mod data;
pub mod detect;
pub mod domain;
pub mod rules;
pub mod state;
pub mod validate;

pub use confirm::{merge, ConfirmationEngine, ConfirmationResult, DEFAULT_REQUIRED_FAILURES};
pub use detect::{DetectionEngine, DetectionOutcome, DetectionSummary};
pub use rules::{RiskTier, Thresholds, ValidationStatus};
pub use state::{JsonStateStore, MemoryStateStore, StateError, StateStore};
pub use validate::{ValidationResult, ValidationSource, Validator};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: engine inputs and outputs can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PriceObservation>();
        require_sync::<domain::PriceObservation>();
        require_send::<domain::SymbolSignal>();
        require_sync::<domain::SymbolSignal>();
        require_send::<domain::TrackingState>();
        require_sync::<domain::TrackingState>();
        require_send::<data::InMemoryHistory>();
        require_sync::<data::InMemoryHistory>();
        require_send::<data::HistoryWindow>();
        require_sync::<data::HistoryWindow>();
        require_send::<DetectionEngine>();
        require_sync::<DetectionEngine>();
        require_send::<MemoryStateStore>();
        require_sync::<MemoryStateStore>();
        require_send::<JsonStateStore>();
        require_sync::<JsonStateStore>();
    }
}
