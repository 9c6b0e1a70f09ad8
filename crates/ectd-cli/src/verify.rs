//! # Verify Subcommand
//!
//! Recomputes every digest listed in a sequence's checksum manifest and
//! reports tampering. Exit code 1 when anything disagrees.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ectd_assembler::verify_sequence;

use crate::context::CliContext;
use crate::SequenceRef;

/// Arguments for the `ectd verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Submission identifier.
    #[arg(value_name = "SUBMISSION", required_unless_present = "dir")]
    pub submission: Option<String>,

    /// Four-digit sequence number.
    #[arg(value_name = "SEQUENCE", required_unless_present = "dir")]
    pub sequence: Option<String>,

    /// Verify this directory instead of one under the base directory.
    #[arg(long, value_name = "PATH", conflicts_with = "submission")]
    pub dir: Option<PathBuf>,
}

/// Execute the verify subcommand.
pub fn run_verify(args: &VerifyArgs, ctx: &CliContext) -> Result<u8> {
    let dir = match (&args.dir, &args.submission, &args.sequence) {
        (Some(dir), _, _) => dir.clone(),
        (None, Some(submission), Some(sequence)) => {
            let key = SequenceRef {
                submission: submission.clone(),
                sequence: sequence.clone(),
            }
            .key()?;
            ctx.assembler()
                .sequence_dir(&key.submission_id, key.sequence_number)
        }
        _ => anyhow::bail!("give <SUBMISSION> <SEQUENCE> or --dir"),
    };

    let report =
        verify_sequence(&dir).with_context(|| format!("verifying {}", dir.display()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_clean() {
        tracing::info!(checked = report.checked, "sequence verified");
        Ok(0)
    } else {
        tracing::warn!(
            mismatched = report.mismatched.len(),
            missing = report.missing.len(),
            unlisted = report.unlisted.len(),
            "sequence failed verification"
        );
        Ok(1)
    }
}
