//! Per-submission build locks.
//!
//! Two builds for the same submission serialize on one mutex from the
//! existence check through the final rename. Builds for different
//! submissions proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use ectd_core::SubmissionId;

/// Lazily-populated map of submission → mutex.
#[derive(Debug, Clone, Default)]
pub struct SubmissionLocks {
    inner: Arc<Mutex<HashMap<SubmissionId, Arc<Mutex<()>>>>>,
}

impl SubmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex for `submission`, created on first use.
    pub fn lock_for(&self, submission: &SubmissionId) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock();
        Arc::clone(map.entry(submission.clone()).or_default())
    }
}
