//! Confirmation state store.
//!
//! Whole-document replace semantics: `load` returns the full state, `save`
//! replaces it. A missing store is an empty initial state. A corrupt store is
//! quarantined and also treated as empty, which restarts every counter at 0;
//! only a failed `save` is surfaced to the caller.
//!
//! The store assumes a single writer. Nothing here locks the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::TrackingState;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("tracking state at {path} is unreadable: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("failed to write tracking state to {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("failed to serialize tracking state: {0}")]
    Serialize(String),
}

/// Load/save access to the persisted [`TrackingState`].
pub trait StateStore {
    /// Current state; never fails (missing or corrupt → empty).
    fn load(&self) -> TrackingState;

    /// Replace the stored state.
    fn save(&self, state: &TrackingState) -> Result<(), StateError>;
}

/// JSON file store with atomic replace (write `.tmp`, rename into place).
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict load: `Ok(None)` if missing, `Err(Corrupt)` if unreadable.
    pub fn try_load(&self) -> Result<Option<TrackingState>, StateError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StateError::Corrupt {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StateError::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
    }

    fn quarantine(&self) {
        let quarantined = self.path.with_extension("json.corrupt");
        if let Err(e) = fs::rename(&self.path, &quarantined) {
            warn!(path = %self.path.display(), error = %e, "could not quarantine corrupt state");
        } else {
            warn!(to = %quarantined.display(), "quarantined corrupt tracking state");
        }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> TrackingState {
        match self.try_load() {
            Ok(Some(state)) => {
                debug!(path = %self.path.display(), entries = state.len(), "loaded tracking state");
                state
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "no tracking state yet, starting empty");
                TrackingState::default()
            }
            Err(e) => {
                warn!(error = %e, "tracking state corrupt, restarting all counters");
                self.quarantine();
                TrackingState::default()
            }
        }
    }

    fn save(&self, state: &TrackingState) -> Result<(), StateError> {
        let write_err = |e: std::io::Error| StateError::Write {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::Serialize(e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(write_err)?;

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            write_err(e)
        })?;

        debug!(path = %self.path.display(), entries = state.len(), "saved tracking state");
        Ok(())
    }
}

/// In-process store for tests and dry runs. `failing()` rejects every save.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<TrackingState>,
    fail_saves: bool,
}

impl MemoryStateStore {
    pub fn new(initial: TrackingState) -> Self {
        Self {
            state: Mutex::new(initial),
            fail_saves: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            state: Mutex::new(TrackingState::default()),
            fail_saves: true,
        }
    }

    pub fn snapshot(&self) -> TrackingState {
        self.load()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> TrackingState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn save(&self, state: &TrackingState) -> Result<(), StateError> {
        if self.fail_saves {
            return Err(StateError::Write {
                path: "memory".into(),
                reason: "store is read-only".into(),
            });
        }
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrackingEntry;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_state() -> TrackingState {
        let mut state = TrackingState {
            last_run: NaiveDate::from_ymd_opt(2024, 5, 6),
            ..TrackingState::default()
        };
        state.failure_counts.insert(
            "ABC".into(),
            TrackingEntry {
                count: 2,
                first_flagged: NaiveDate::from_ymd_opt(2024, 5, 3),
                reason: "penny stock".into(),
            },
        );
        state
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStateStore::new(tmp.path().join("tracking.json"));
        assert_eq!(store.load(), TrackingState::default());
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStateStore::new(tmp.path().join("nested/tracking.json"));
        store.save(&sample_state()).unwrap();
        assert_eq!(store.load(), sample_state());
        assert!(!tmp.path().join("nested/tracking.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_quarantined_and_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tracking.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonStateStore::new(&path);

        assert!(matches!(store.try_load(), Err(StateError::Corrupt { .. })));
        assert_eq!(store.load(), TrackingState::default());
        assert!(!path.exists());
        assert!(tmp.path().join("tracking.json.corrupt").exists());
    }

    #[test]
    fn save_into_unwritable_location_errors() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // Parent "directory" is a regular file
        let store = JsonStateStore::new(blocker.join("tracking.json"));
        assert!(matches!(
            store.save(&sample_state()),
            Err(StateError::Write { .. })
        ));
    }

    #[test]
    fn memory_store_roundtrip_and_failure() {
        let store = MemoryStateStore::default();
        store.save(&sample_state()).unwrap();
        assert_eq!(store.snapshot(), sample_state());

        let failing = MemoryStateStore::failing();
        assert!(failing.save(&sample_state()).is_err());
        assert!(failing.load().is_empty());
    }
}
