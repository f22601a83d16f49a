//! StaleWatch CLI: detection, confirmation and cleanup reporting.
//!
//! Commands:
//! - `run`: full pipeline: detect, confirm, validate, write reports
//! - `detect`: detection only, tracking state untouched
//! - `status`: print the confirmation tracking state
//! - `validate`: classify individual symbols from fresh history
//! - `log`: print the removal log

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use stalewatch_core::data::{open_history, InMemoryHistory, PriceHistorySource, Watchlist};
use stalewatch_core::domain::SymbolSignal;
use stalewatch_core::validate::{ValidationResult, Validator};
use stalewatch_core::{JsonStateStore, StateStore};
use stalewatch_runner::{
    run_detection, run_pipeline, write_run_artifacts, PipelineOutcome, RemovalLog,
    StaleWatchConfig,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "stalewatch.toml";

#[derive(Parser)]
#[command(
    name = "stalewatch",
    about = "StaleWatch: stale price and delisting monitor for a securities watchlist"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./stalewatch.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run date (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    today: Option<String>,

    /// Debug-level logging (RUST_LOG overrides).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: detect, confirm, validate, recommend, write reports.
    Run {
        /// Skip writing reports, removal log and cleanup script.
        #[arg(long, default_value_t = false)]
        no_write: bool,
    },
    /// Detection only. Does not touch the tracking state.
    Detect {
        /// Print signals as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the confirmation tracking state.
    Status {
        /// Print the raw state document.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Classify symbols from fresh history.
    Validate {
        /// Symbols to validate (e.g., AAPL MSFT).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Print results as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the removal log.
    Log,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let now = Local::now().naive_local();
    let today = cli
        .today
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--today must be YYYY-MM-DD")?
        .unwrap_or_else(|| now.date());

    match cli.command {
        Commands::Run { no_write } => run_full(&config, today, now, no_write),
        Commands::Detect { json } => run_detect(&config, today, json),
        Commands::Status { json } => run_status(&config, json),
        Commands::Validate { symbols, json } => run_validate(&config, &symbols, now, json),
        Commands::Log => run_log(&config),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<StaleWatchConfig> {
    match path {
        Some(p) => Ok(StaleWatchConfig::from_file(p)?),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            Ok(StaleWatchConfig::from_file(Path::new(DEFAULT_CONFIG))?)
        }
        None => Ok(StaleWatchConfig::default()),
    }
}

fn open_sources(config: &StaleWatchConfig) -> (Option<InMemoryHistory>, Watchlist) {
    let history = open_history(&config.paths.history)
        .map_err(|e| warn!(error = %e, "price history unavailable"))
        .ok();
    let watchlist = Watchlist::from_file(&config.paths.watchlist).unwrap_or_else(|e| {
        warn!(error = %e, "watchlist unavailable");
        Watchlist::from_symbols(config.watchlist_name(), Vec::<String>::new())
    });
    (history, watchlist)
}

fn run_full(
    config: &StaleWatchConfig,
    today: NaiveDate,
    now: NaiveDateTime,
    no_write: bool,
) -> Result<()> {
    let (history, watchlist) = open_sources(config);
    let store = JsonStateStore::new(&config.paths.state);

    let outcome = run_pipeline(
        config,
        history.as_ref().map(|h| h as &dyn PriceHistorySource),
        &watchlist,
        &store,
        today,
        now,
    )?;

    print_outcome(&outcome);

    if outcome.is_completed() && !no_write {
        let paths = write_run_artifacts(&outcome, config, now)?;
        println!();
        println!("Reports written to: {}", config.paths.output_dir.display());
        if let Some(script) = &paths.cleanup_script {
            println!("Cleanup script:     {}", script.display());
        }
        if !paths.newly_logged.is_empty() {
            println!(
                "Removal log:        +{} ({})",
                paths.newly_logged.len(),
                paths.newly_logged.join(", ")
            );
        }
    }
    Ok(())
}

fn run_detect(config: &StaleWatchConfig, today: NaiveDate, json: bool) -> Result<()> {
    let (history, watchlist) = open_sources(config);
    let run = run_detection(
        config,
        history.as_ref().map(|h| h as &dyn PriceHistorySource),
        &watchlist,
        today,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&run.signals)?);
        return Ok(());
    }

    println!("Status: {}  ({} symbols in universe)", run.status, run.universe_size);
    if run.signals.is_empty() {
        println!("No securities flagged.");
        return Ok(());
    }
    print_signal_table(&run.signals);
    Ok(())
}

fn run_status(config: &StaleWatchConfig, json: bool) -> Result<()> {
    let store = JsonStateStore::new(&config.paths.state);
    let state = store.load();

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    let required = config.confirmation.required_failures;
    println!("State file: {}", config.paths.state.display());
    match state.last_run {
        Some(d) => println!("Last run:   {d}"),
        None => println!("Last run:   never"),
    }
    println!(
        "Tracked:    {}  failing: {}  confirmed (>= {required}): {}",
        state.len(),
        state.failing().len(),
        state.confirmed_count(required)
    );

    let failing = state.failing();
    if failing.is_empty() {
        return Ok(());
    }
    println!();
    println!("{:<10} {:>5} {:<12} Reason", "Symbol", "Count", "Since");
    println!("{}", "-".repeat(70));
    for (symbol, entry) in failing {
        let since = entry
            .first_flagged
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into());
        let marker = if entry.count >= required { "*" } else { " " };
        println!(
            "{symbol:<10} {:>4}{marker} {since:<12} {}",
            entry.count, entry.reason
        );
    }
    Ok(())
}

fn run_validate(
    config: &StaleWatchConfig,
    symbols: &[String],
    now: NaiveDateTime,
    json: bool,
) -> Result<()> {
    let (history, _) = open_sources(config);
    let mut validator = Validator::new(config.thresholds.clone())
        .with_history_days(config.validation.history_days);
    if let Some(h) = history.as_ref() {
        validator = validator.with_source(h);
    }

    let results: Vec<ValidationResult> = symbols
        .iter()
        .map(|s| validator.validate(&s.trim().to_uppercase(), None, now))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    for r in &results {
        println!("{:<10} {:<12} {}", r.symbol, r.status.as_str(), r.reason);
    }
    Ok(())
}

fn run_log(config: &StaleWatchConfig) -> Result<()> {
    let log = RemovalLog::load(&config.paths.removal_log)?;
    if log.is_empty() {
        println!("Removal log is empty: {}", config.paths.removal_log.display());
        return Ok(());
    }
    if let Some(updated) = log.last_updated {
        println!("Last updated: {updated}");
    }
    println!("{:<10} {:<12} {:<10} {:>10}  Reason", "Symbol", "Date", "Status", "Last");
    println!("{}", "-".repeat(70));
    for r in &log.removals {
        println!(
            "{:<10} {:<12} {:<10} {:>10.4}  {}",
            r.symbol,
            r.date.to_string(),
            r.status.as_str(),
            r.last_price,
            r.reason
        );
    }
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome) {
    println!();
    println!("=== StaleWatch {} ===", outcome.today);
    println!("Status:          {}", outcome.status);
    if !outcome.is_completed() {
        println!("Nothing to do. Tracking state unchanged.");
        return;
    }

    let s = &outcome.detection_summary;
    let risk = &outcome.recommendations.risk_assessment;
    println!("Universe:        {}", outcome.universe_size);
    println!(
        "Flagged:         {}  (HIGH {}, MEDIUM {}, LOW {}; no-data {})",
        s.total_flagged, s.high_risk, s.medium_risk, s.low_risk, s.no_data
    );
    println!(
        "Confirmed:       {}  (new {}, recovered {})",
        outcome.confirmed.len(),
        outcome.newly_tracked.len(),
        outcome.recovered.len()
    );
    println!(
        "Data quality:    {}/100  risk {}  urgency {:?}",
        risk.data_quality_score, risk.overall_risk, risk.recommendations_urgency
    );

    if !outcome.confirmed.is_empty() {
        println!();
        let confirmed: Vec<SymbolSignal> =
            outcome.confirmed.iter().map(|c| c.signal.clone()).collect();
        print_signal_table(&confirmed);
    }

    if !outcome.validations.is_empty() {
        println!();
        println!("Validation:");
        for v in &outcome.validations {
            println!("  {:<10} {:<12} {}", v.symbol, v.status.as_str(), v.reason);
        }
    }

    println!();
    println!("Actions:");
    for a in &outcome.recommendations.cleanup_actions {
        println!("  [{}] {}", a.priority, a.description);
        if !a.affected_symbols.is_empty() {
            let shown: Vec<&str> = a
                .affected_symbols
                .iter()
                .take(5)
                .map(|s| s.as_str())
                .collect();
            let more = a.affected_symbols.len().saturating_sub(5);
            if more > 0 {
                println!("      {} (+{more} more)", shown.join(", "));
            } else {
                println!("      {}", shown.join(", "));
            }
        }
    }
}

fn print_signal_table(signals: &[SymbolSignal]) {
    println!(
        "{:<10} {:<7} {:>10} {:>5} {:>12}  Reasons",
        "Symbol", "Risk", "Price", "Run", "Avg volume"
    );
    println!("{}", "-".repeat(80));
    for s in signals {
        println!(
            "{:<10} {:<7} {:>10.4} {:>5} {:>12.0}  {}",
            s.symbol,
            s.risk.as_str(),
            s.latest_close,
            s.max_consecutive,
            s.avg_volume,
            s.reason_text()
        );
    }
}
