//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor: the profile registry (read-only after startup)
//! and the acknowledgement tracker, optionally backed by a ledger file.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use ectd_core::{EctdError, SequenceKey};
use ectd_profile::ProfileRegistry;
use ectd_state::{AckError, AcknowledgementTracker};

use crate::error::AppError;

/// File name of the acknowledgement ledger under the base directory.
pub const LEDGER_FILE: &str = "acknowledgements.json";

/// Process configuration, read from the environment.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub port: u16,
    /// `ECTD_BASE_DIR`: sequence root; the ledger lives here when set.
    pub base_dir: Option<PathBuf>,
    /// `ECTD_PROFILES`: YAML profile file replacing the built-in table.
    pub profiles_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_dir: std::env::var_os("ECTD_BASE_DIR").map(PathBuf::from),
            profiles_path: std::env::var_os("ECTD_PROFILES").map(PathBuf::from),
        }
    }

    pub fn ledger_path(&self) -> Option<PathBuf> {
        self.base_dir.as_ref().map(|d| d.join(LEDGER_FILE))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<ProfileRegistry>,
    pub tracker: Arc<AcknowledgementTracker>,
    ledger: Option<PathBuf>,
    persist_lock: Arc<Mutex<()>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Built-in profiles, in-memory tracker.
    pub fn new() -> Self {
        Self::with_parts(ProfileRegistry::builtin(), AcknowledgementTracker::new(), None)
    }

    pub fn with_parts(
        registry: ProfileRegistry,
        tracker: AcknowledgementTracker,
        ledger: Option<PathBuf>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            tracker: Arc::new(tracker),
            ledger,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load profiles and the ledger named by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, EctdError> {
        let registry = match &config.profiles_path {
            Some(path) => ProfileRegistry::load(path)?,
            None => ProfileRegistry::builtin(),
        };
        let ledger = config.ledger_path();
        let tracker = match &ledger {
            Some(path) => AcknowledgementTracker::load(path)?,
            None => AcknowledgementTracker::new(),
        };
        Ok(Self::with_parts(registry, tracker, ledger))
    }

    /// Apply one tracker mutation and write the ledger. When the write
    /// fails the record is restored, so memory never runs ahead of the
    /// ledger and the client may retry. Mutations are serialized while a
    /// ledger is configured.
    pub fn mutate<T, F>(&self, key: &SequenceKey, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&AcknowledgementTracker) -> Result<T, AckError>,
    {
        let Some(path) = &self.ledger else {
            return Ok(f(&self.tracker)?);
        };
        let _guard = self.persist_lock.lock();
        let previous = self.tracker.get(key).ok();
        let value = f(&self.tracker)?;
        if let Err(e) = self.tracker.save(path) {
            self.tracker.restore(key, previous);
            return Err(e.into());
        }
        Ok(value)
    }
}
