//! # Envelope Subcommand
//!
//! Writes the regional envelope for a sequence that has already been
//! built, from its build record and an applicant metadata file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ectd_assembler::{build_envelope, ApplicantMeta, SequenceBuildResult};

use crate::context::CliContext;
use crate::SequenceRef;

/// Arguments for the `ectd envelope` subcommand.
#[derive(Args, Debug)]
pub struct EnvelopeArgs {
    #[command(flatten)]
    pub sequence: SequenceRef,

    /// YAML file with applicant and procedure metadata.
    #[arg(long, value_name = "PATH")]
    pub applicant: PathBuf,

    /// Write the envelope here instead of standard output.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print the envelope as JSON instead of XML.
    #[arg(long)]
    pub json: bool,
}

/// Execute the envelope subcommand.
pub fn run_envelope(args: &EnvelopeArgs, ctx: &CliContext) -> Result<u8> {
    let key = args.sequence.key()?;
    let record = ctx
        .assembler()
        .record_path(&key.submission_id, key.sequence_number);
    let built = SequenceBuildResult::load_record(&record)
        .with_context(|| format!("reading build record {}", record.display()))?;

    let text = std::fs::read_to_string(&args.applicant)
        .with_context(|| format!("reading {}", args.applicant.display()))?;
    let applicant: ApplicantMeta = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing applicant metadata {}", args.applicant.display()))?;

    let profile = ctx.registry.profile_for(built.region)?;
    let envelope = build_envelope(&built, profile, &applicant)?;
    let rendered = if args.json {
        serde_json::to_string_pretty(&envelope)?
    } else {
        envelope.to_xml()
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "envelope written");
        }
        None => println!("{rendered}"),
    }
    Ok(0)
}
