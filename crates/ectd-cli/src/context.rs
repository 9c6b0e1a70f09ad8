//! Settings shared by every subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use fslock::LockFile;

use ectd_assembler::SequenceAssembler;
use ectd_profile::ProfileRegistry;
use ectd_state::AcknowledgementTracker;

/// Default sequence root when neither `--base-dir` nor `ECTD_BASE_DIR` is set.
pub const DEFAULT_BASE_DIR: &str = "submissions";

/// File name of the acknowledgement ledger under the base directory.
pub const LEDGER_FILE: &str = "acknowledgements.json";

/// Advisory lock held while the ledger is read, changed and written back.
pub const LEDGER_LOCK_FILE: &str = "acknowledgements.json.lock";

#[derive(Debug, Clone)]
pub struct CliContext {
    pub base_dir: PathBuf,
    pub registry: Arc<ProfileRegistry>,
}

impl CliContext {
    /// Resolve flags, falling back to `ECTD_BASE_DIR` / `ECTD_PROFILES`.
    pub fn resolve(base_dir: Option<PathBuf>, profiles: Option<PathBuf>) -> Result<Self> {
        let base_dir = base_dir
            .or_else(|| std::env::var_os("ECTD_BASE_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR));
        let profiles = profiles.or_else(|| std::env::var_os("ECTD_PROFILES").map(PathBuf::from));
        let registry = match profiles {
            Some(path) => ProfileRegistry::load(&path)
                .with_context(|| format!("loading profiles from {}", path.display()))?,
            None => ProfileRegistry::builtin(),
        };
        tracing::debug!(base_dir = %base_dir.display(), "resolved base directory");
        Ok(Self::new(base_dir, registry))
    }

    pub fn new(base_dir: impl Into<PathBuf>, registry: ProfileRegistry) -> Self {
        Self {
            base_dir: base_dir.into(),
            registry: Arc::new(registry),
        }
    }

    pub fn assembler(&self) -> SequenceAssembler {
        SequenceAssembler::new(&self.base_dir, Arc::clone(&self.registry))
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.base_dir.join(LEDGER_FILE)
    }

    /// Read-only view of the ledger.
    pub fn load_tracker(&self) -> Result<AcknowledgementTracker> {
        let path = self.ledger_path();
        AcknowledgementTracker::load(&path)
            .with_context(|| format!("reading acknowledgement ledger {}", path.display()))
    }

    /// Load the ledger, apply `f`, and write the ledger back, all under the
    /// ledger's file lock so concurrent `ectd` processes serialize. Nothing
    /// is written when `f` fails.
    pub fn update_ledger<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&AcknowledgementTracker) -> Result<T>,
    {
        std::fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("creating {}", self.base_dir.display()))?;
        let lock_path = self.base_dir.join(LEDGER_LOCK_FILE);
        let mut lock = LockFile::open(&lock_path)
            .with_context(|| format!("opening ledger lock {}", lock_path.display()))?;
        lock.lock()
            .with_context(|| format!("locking {}", lock_path.display()))?;

        let tracker = self.load_tracker()?;
        let value = f(&tracker)?;
        let path = self.ledger_path();
        tracker
            .save(&path)
            .with_context(|| format!("writing acknowledgement ledger {}", path.display()))?;
        Ok(value)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
