//! # ectd-cli — The `ectd` Command-Line Tool
//!
//! ## Subcommands
//!
//! - `ectd build` — assemble a sequence from a document inventory.
//! - `ectd verify` — recompute a sequence's checksums.
//! - `ectd validate` — report mandatory modules a sequence or module set lacks.
//! - `ectd envelope` — write the regional envelope for a built sequence.
//! - `ectd ack` — register, submit, ingest gateway events, show status.
//!
//! ```bash
//! ectd --base-dir out build --submission PID --sequence 0001 --region FDA --inventory docs.yaml
//! ectd --base-dir out verify PID 0001
//! ectd --base-dir out validate --submission PID --sequence 0001
//! ectd --base-dir out ack event PID 0001 --tier 2 --receipt receipts/ack2.xml --failed
//! ```
//!
//! Every handler returns an exit code: 0 on success, 1 when the checked
//! artifact fails (incomplete sequence, tampered files). Operational errors
//! propagate as `anyhow::Error`.

pub mod ack;
pub mod build;
pub mod context;
pub mod envelope;
pub mod validate;
pub mod verify;

pub use context::CliContext;

use clap::Args;

use ectd_core::{SequenceKey, SequenceNumber, SubmissionId};

/// `<SUBMISSION> <SEQUENCE>` positional pair shared by several subcommands.
#[derive(Args, Debug, Clone)]
pub struct SequenceRef {
    /// Submission identifier.
    #[arg(value_name = "SUBMISSION")]
    pub submission: String,

    /// Four-digit sequence number, e.g. 0001.
    #[arg(value_name = "SEQUENCE")]
    pub sequence: String,
}

impl SequenceRef {
    pub fn key(&self) -> anyhow::Result<SequenceKey> {
        Ok(SequenceKey::new(
            SubmissionId::new(self.submission.as_str())?,
            SequenceNumber::parse(&self.sequence)?,
        ))
    }
}
