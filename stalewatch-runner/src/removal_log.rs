//! Append-only removal log.
//!
//! One entry per symbol, ever: a symbol already in the log is never logged
//! again, even if its status changes later.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use stalewatch_core::rules::ValidationStatus;
use stalewatch_core::validate::ValidationResult;

use crate::report::write_json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalEntry {
    pub symbol: String,
    pub date: NaiveDate,
    pub reason: String,
    pub status: ValidationStatus,
    pub last_price: f64,
    pub watchlist: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemovalLog {
    pub last_updated: Option<NaiveDateTime>,
    #[serde(default)]
    pub removals: Vec<RemovalEntry>,
}

impl RemovalLog {
    /// Read the log; a missing file is an empty log.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read removal log {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parse removal log {}", path.display()))
    }

    /// Like [`RemovalLog::load`], but an unreadable log is moved aside to
    /// `<name>.json.corrupt` and replaced by an empty one.
    pub fn load_or_recover(path: &Path) -> Self {
        match Self::load(path) {
            Ok(log) => log,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "removal log unreadable, starting a new one");
                let quarantined = path.with_extension("json.corrupt");
                match std::fs::rename(path, &quarantined) {
                    Ok(()) => warn!(to = %quarantined.display(), "quarantined corrupt removal log"),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "could not quarantine removal log")
                    }
                }
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.removals.iter().any(|r| r.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.removals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
    }

    /// Append unless the symbol is already logged. Returns whether it appended.
    pub fn append(&mut self, entry: RemovalEntry, now: NaiveDateTime) -> bool {
        if self.contains(&entry.symbol) {
            debug!(symbol = %entry.symbol, "already in removal log");
            return false;
        }
        self.removals.push(entry);
        self.last_updated = Some(now);
        true
    }

    /// Log every DELISTED validation result. Returns the newly logged symbols.
    pub fn log_delisted(
        &mut self,
        validations: &[ValidationResult],
        watchlist: &str,
        now: NaiveDateTime,
    ) -> Vec<String> {
        let mut added = Vec::new();
        for v in validations
            .iter()
            .filter(|v| v.status == ValidationStatus::Delisted)
        {
            let entry = RemovalEntry {
                symbol: v.symbol.clone(),
                date: now.date(),
                reason: v.reason.clone(),
                status: ValidationStatus::Delisted,
                last_price: v.last_price.unwrap_or(0.0),
                watchlist: watchlist.to_string(),
            };
            if self.append(entry, now) {
                added.push(v.symbol.clone());
            }
        }
        if !added.is_empty() {
            info!(count = added.len(), "logged delisted securities");
        }
        added
    }
}
