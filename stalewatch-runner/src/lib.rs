//! StaleWatch Runner: configuration, orchestration, reports.
//!
//! This crate builds on `stalewatch-core` to provide:
//! - TOML configuration with defaults and validation
//! - The single-invocation pipeline (detect, confirm, validate, recommend)
//! - Cleanup recommendations and maintenance schedule
//! - JSON report documents, the append-only removal log, the SQL cleanup script

pub mod cleanup_script;
pub mod config;
pub mod pipeline;
pub mod recommend;
pub mod removal_log;
pub mod report;

pub use cleanup_script::render_cleanup_sql;
pub use config::{ConfigError, StaleWatchConfig};
pub use pipeline::{run_detection, run_pipeline, DetectionRun, PipelineError, PipelineOutcome, RunStatus};
pub use recommend::{ActionItem, CleanupAction, Recommendations, Urgency};
pub use removal_log::{RemovalEntry, RemovalLog};
pub use report::{write_run_artifacts, ArtifactPaths, StalePriceReport, ValidationReport};
