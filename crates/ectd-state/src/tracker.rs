//! # Acknowledgement Tracker
//!
//! Keyed store of [`Acknowledgement`] records. The outer map is behind a
//! read/write lock and is only write-locked to insert a record; each record
//! has its own mutex, so events for different sequences never contend.
//!
//! The ledger file is a JSON array of records sorted by sequence key,
//! written atomically (temporary file in the same directory, then rename).

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use ectd_core::{EctdError, SequenceKey};

use crate::acknowledgement::{AckError, AckEvent, AckStatusView, Acknowledgement};

#[derive(Debug, Default)]
pub struct AcknowledgementTracker {
    records: RwLock<HashMap<SequenceKey, Arc<Mutex<Acknowledgement>>>>,
}

impl AcknowledgementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, key: &SequenceKey) -> Result<Arc<Mutex<Acknowledgement>>, AckError> {
        self.records
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| AckError::NotFound(key.to_string()))
    }

    /// Create the record for a newly built sequence, in `CREATED`.
    pub fn register(&self, key: SequenceKey) -> Result<AckStatusView, AckError> {
        let mut records = self.records.write();
        if records.contains_key(&key) {
            return Err(AckError::AlreadyRegistered(key.to_string()));
        }
        let ack = Acknowledgement::new(key.clone());
        let view = ack.view();
        tracing::info!(sequence = %key, "acknowledgement record created");
        records.insert(key, Arc::new(Mutex::new(ack)));
        Ok(view)
    }

    /// CREATED → SUBMITTED.
    pub fn mark_submitted(&self, key: &SequenceKey) -> Result<AckStatusView, AckError> {
        let record = self.record(key)?;
        let mut ack = record.lock();
        ack.mark_submitted()?;
        tracing::info!(sequence = %key, "sequence submitted");
        Ok(ack.view())
    }

    /// Apply a gateway event under the sequence's lock.
    pub fn apply(&self, key: &SequenceKey, event: &AckEvent) -> Result<AckStatusView, AckError> {
        let record = self.record(key)?;
        let mut ack = record.lock();
        match ack.apply(event) {
            Ok(true) => {
                tracing::info!(
                    sequence = %key,
                    tier = event.tier.number(),
                    status = %ack.status(),
                    "acknowledgement applied"
                );
            }
            Ok(false) => {
                tracing::debug!(sequence = %key, tier = event.tier.number(), "duplicate acknowledgement ignored");
            }
            Err(e) => {
                tracing::warn!(sequence = %key, tier = event.tier.number(), error = %e, "acknowledgement rejected");
                return Err(e);
            }
        }
        Ok(ack.view())
    }

    /// Three receipt paths and the status of one sequence.
    pub fn status(&self, key: &SequenceKey) -> Result<AckStatusView, AckError> {
        Ok(self.record(key)?.lock().view())
    }

    /// Full record, including history.
    pub fn get(&self, key: &SequenceKey) -> Result<Acknowledgement, AckError> {
        Ok(self.record(key)?.lock().clone())
    }

    /// Put `key` back to `previous`, or drop it when it had no record
    /// before. Only for undoing a change whose ledger write failed; callers
    /// must serialize this with the change being undone.
    pub fn restore(&self, key: &SequenceKey, previous: Option<Acknowledgement>) {
        let mut records = self.records.write();
        match previous {
            Some(ack) => match records.get(key) {
                Some(record) => *record.lock() = ack,
                None => {
                    records.insert(key.clone(), Arc::new(Mutex::new(ack)));
                }
            },
            None => {
                records.remove(key);
            }
        }
        tracing::warn!(sequence = %key, "acknowledgement change rolled back");
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Snapshot of every record, sorted by key.
    pub fn snapshot(&self) -> Vec<Acknowledgement> {
        let handles: Vec<_> = self.records.read().values().cloned().collect();
        let mut records: Vec<Acknowledgement> = handles.iter().map(|h| h.lock().clone()).collect();
        records.sort_by(|a, b| a.key().cmp(b.key()));
        records
    }

    /// Rebuild a tracker from a ledger file. A missing file is an empty
    /// ledger.
    pub fn load(path: &Path) -> Result<Self, EctdError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        let records: Vec<Acknowledgement> = serde_json::from_str(&text).map_err(|e| {
            EctdError::Serialization(format!("acknowledgement ledger {}: {e}", path.display()))
        })?;

        let mut map = HashMap::with_capacity(records.len());
        for record in records {
            record.check_consistency()?;
            let key = record.key().clone();
            if map.insert(key.clone(), Arc::new(Mutex::new(record))).is_some() {
                return Err(EctdError::Serialization(format!(
                    "acknowledgement ledger {} lists {key} twice",
                    path.display()
                )));
            }
        }
        tracing::debug!(path = %path.display(), records = map.len(), "loaded acknowledgement ledger");
        Ok(Self {
            records: RwLock::new(map),
        })
    }

    /// Write every record to `path`, replacing it atomically.
    pub fn save(&self, path: &Path) -> Result<(), EctdError> {
        let json = serde_json::to_vec_pretty(&self.snapshot())
            .map_err(|e| EctdError::Serialization(e.to_string()))?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| EctdError::Io(e.error))?;
        Ok(())
    }
}
