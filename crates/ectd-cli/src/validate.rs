//! # Validate Subcommand
//!
//! Reports the mandatory modules of a region that a sequence (or an
//! explicit module set, or an inventory) does not expose.
//!
//! Exit code 1 when anything mandatory is missing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ectd_assembler::{
    check_sequence, collect, module_set, InventoryFileStore, InventoryFilter,
    SequenceBuildResult,
};
use ectd_core::{RegionCode, SequenceNumber, SubmissionId};
use ectd_profile::{check_modules, ModuleReport};

use crate::context::CliContext;

/// Arguments for the `ectd validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Region to validate against. Defaults to the region a built
    /// sequence was assembled for.
    #[arg(long)]
    pub region: Option<String>,

    /// Comma-separated module codes to check, e.g. m1,m2,m2.5.
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["inventory", "submission"])]
    pub modules: Vec<String>,

    /// Check the approved documents of an inventory file.
    #[arg(long, value_name = "PATH", conflicts_with = "submission")]
    pub inventory: Option<PathBuf>,

    /// Check a built sequence (requires --sequence).
    #[arg(long, requires = "sequence")]
    pub submission: Option<String>,

    #[arg(long, requires = "submission")]
    pub sequence: Option<String>,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs, ctx: &CliContext) -> Result<u8> {
    let region: Option<RegionCode> = args
        .region
        .as_deref()
        .map(|r| r.parse::<RegionCode>())
        .transpose()?;

    let report = match (&args.submission, &args.sequence) {
        (Some(submission), Some(sequence)) => {
            let submission = SubmissionId::new(submission.as_str())?;
            let sequence = SequenceNumber::parse(sequence)?;
            let record = ctx.assembler().record_path(&submission, sequence);
            let built = SequenceBuildResult::load_record(&record)
                .with_context(|| format!("reading build record {}", record.display()))?;
            match region {
                Some(region) if region != built.region => {
                    check_modules(&ctx.registry, region, built.module_codes())?
                }
                _ => check_sequence(&ctx.registry, &built)?,
            }
        }
        _ => {
            let region = region
                .context("--region is required unless a built sequence is given")?;
            let present = match &args.inventory {
                Some(path) => {
                    let documents =
                        collect(&InventoryFileStore::new(path), &InventoryFilter::approved())
                            .with_context(|| format!("reading inventory {}", path.display()))?;
                    module_set(&documents)
                }
                None => args.modules.iter().cloned().collect(),
            };
            check_modules(&ctx.registry, region, present)?
        }
    };

    print_report(&report)?;
    Ok(if report.is_complete() { 0 } else { 1 })
}

fn print_report(report: &ModuleReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    if !report.is_complete() {
        tracing::warn!(region = %report.region, missing = ?report.missing, "mandatory modules missing");
    }
    Ok(())
}
