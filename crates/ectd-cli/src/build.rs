//! # Build Subcommand
//!
//! Collects documents from an inventory file, loads the prior sequence
//! snapshot, assembles the sequence directory, and records the result:
//! the build record beside the sequence directory and a `CREATED` entry in
//! the acknowledgement ledger.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use ectd_assembler::{
    check_sequence, collect, BuildRequest, InventoryFileStore, InventoryFilter, Operation,
    SequenceBuildResult,
};
use ectd_core::{RegionCode, SequenceNumber, SubmissionId};

use crate::context::CliContext;

/// Arguments for the `ectd build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Submission identifier.
    #[arg(long)]
    pub submission: String,

    /// Four-digit sequence number to create, e.g. 0001.
    #[arg(long)]
    pub sequence: String,

    /// Target region (FDA, EMA, PMDA, HC).
    #[arg(long)]
    pub region: String,

    /// YAML inventory listing candidate documents.
    #[arg(long, value_name = "PATH")]
    pub inventory: PathBuf,

    /// Only include documents under this module code (e.g. m2).
    #[arg(long)]
    pub module_prefix: Option<String>,

    /// Include documents regardless of approval status.
    #[arg(long)]
    pub any_status: bool,

    /// Emit unchanged indexed documents as `replace` leaves.
    #[arg(long)]
    pub force_include_unchanged: bool,

    /// Build as if no earlier sequence existed.
    #[arg(long)]
    pub no_prior: bool,
}

/// Printed on success.
#[derive(Debug, Serialize)]
pub struct BuildSummary {
    pub sequence: String,
    pub region: RegionCode,
    pub sequence_dir: PathBuf,
    pub files: usize,
    pub new: usize,
    pub replace: usize,
    pub delete: usize,
    /// Mandatory modules the sequence lacks. Informational only.
    pub missing_modules: Vec<String>,
}

impl BuildSummary {
    fn from_result(result: &SequenceBuildResult, missing_modules: Vec<String>) -> Self {
        let count = |op: Operation| result.entries.iter().filter(|e| e.operation == op).count();
        Self {
            sequence: result.key.to_string(),
            region: result.region,
            sequence_dir: result.sequence_dir.clone(),
            files: result.files.len(),
            new: count(Operation::New),
            replace: count(Operation::Replace),
            delete: count(Operation::Delete),
            missing_modules,
        }
    }
}

/// Execute the build subcommand.
pub fn run_build(args: &BuildArgs, ctx: &CliContext) -> Result<u8> {
    let submission = SubmissionId::new(args.submission.as_str())?;
    let sequence = SequenceNumber::parse(&args.sequence)?;
    let region: RegionCode = args.region.parse()?;

    let mut filter = if args.any_status {
        InventoryFilter::any_status()
    } else {
        InventoryFilter::approved()
    };
    if let Some(prefix) = &args.module_prefix {
        filter = filter.with_module_prefix(prefix.as_str());
    }

    let store = InventoryFileStore::new(&args.inventory);
    let documents = collect(&store, &filter)
        .with_context(|| format!("reading inventory {}", args.inventory.display()))?;
    tracing::info!(count = documents.len(), "collected documents");

    let assembler = ctx.assembler();
    let mut request = BuildRequest::new(submission.clone(), sequence, region, documents)
        .force_include_unchanged(args.force_include_unchanged);
    if !args.no_prior {
        if let Some(prior) = assembler
            .prior_for(&submission, sequence)
            .context("loading prior sequence")?
        {
            request = request.with_prior(prior);
        }
    }

    let result = assembler
        .build(request)
        .with_context(|| format!("building {submission}/{sequence}"))?;

    let record = assembler.record_path(&submission, sequence);
    result
        .save_record(&record)
        .with_context(|| format!("writing build record {}", record.display()))?;

    ctx.update_ledger(|tracker| Ok(tracker.register(result.key.clone())?))?;

    let report = check_sequence(&ctx.registry, &result)?;
    let summary = BuildSummary::from_result(&result, report.missing);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(0)
}
