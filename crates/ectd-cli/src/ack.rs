//! # Ack Subcommand
//!
//! Gateway acknowledgement tracking against the ledger file under the base
//! directory. Every mutation is written back before the command returns.

use anyhow::Result;
use clap::{Args, Subcommand};

use ectd_state::{AckEvent, AckTier};

use crate::context::CliContext;
use crate::SequenceRef;

/// Arguments for the `ectd ack` subcommand.
#[derive(Args, Debug)]
pub struct AckArgs {
    #[command(subcommand)]
    pub command: AckCommand,
}

#[derive(Subcommand, Debug)]
pub enum AckCommand {
    /// Start tracking a sequence (state CREATED).
    Register(SequenceRef),

    /// Record that the sequence was sent to the gateway.
    Submit(SequenceRef),

    /// Ingest a tier-1/2/3 acknowledgement.
    Event(EventArgs),

    /// Show the acknowledgement state of a sequence.
    Status(SequenceRef),

    /// List every tracked sequence.
    List,
}

#[derive(Args, Debug)]
pub struct EventArgs {
    #[command(flatten)]
    pub sequence: SequenceRef,

    /// Acknowledgement tier: 1, 2 or 3.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub tier: u8,

    /// Path of the receipt artifact.
    #[arg(long, value_name = "PATH")]
    pub receipt: String,

    /// Tier-2 content check passed.
    #[arg(long, conflicts_with = "failed")]
    pub passed: bool,

    /// Tier-2 content check failed.
    #[arg(long)]
    pub failed: bool,
}

impl EventArgs {
    fn event(&self) -> Result<AckEvent> {
        let tier = AckTier::try_from(self.tier)?;
        let passed = match (self.passed, self.failed) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Ok(AckEvent {
            tier,
            receipt_path: self.receipt.clone(),
            passed,
        })
    }
}

/// Execute the ack subcommand.
pub fn run_ack(args: &AckArgs, ctx: &CliContext) -> Result<u8> {
    let view = match &args.command {
        AckCommand::Register(sequence) => {
            ctx.update_ledger(|t| Ok(t.register(sequence.key()?)?))?
        }
        AckCommand::Submit(sequence) => {
            ctx.update_ledger(|t| Ok(t.mark_submitted(&sequence.key()?)?))?
        }
        AckCommand::Event(event) => ctx.update_ledger(|t| {
            Ok(t.apply(&event.sequence.key()?, &event.event()?)?)
        })?,
        AckCommand::Status(sequence) => ctx.load_tracker()?.status(&sequence.key()?)?,
        AckCommand::List => {
            let records = ctx.load_tracker()?.snapshot();
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(0);
        }
    };

    if !matches!(args.command, AckCommand::Status(_)) {
        tracing::info!(status = %view.status, "acknowledgement ledger updated");
    }
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(0)
}
