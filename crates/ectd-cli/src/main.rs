//! # ectd CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ectd_cli::ack::{run_ack, AckArgs};
use ectd_cli::build::{run_build, BuildArgs};
use ectd_cli::envelope::{run_envelope, EnvelopeArgs};
use ectd_cli::validate::{run_validate, ValidateArgs};
use ectd_cli::verify::{run_verify, VerifyArgs};
use ectd_cli::CliContext;

/// eCTD sequence assembler and regional compliance validator.
#[derive(Parser, Debug)]
#[command(name = "ectd", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Root directory holding `<submission>/<sequence>` trees.
    /// Falls back to ECTD_BASE_DIR, then `./submissions`.
    #[arg(long, global = true, value_name = "PATH")]
    base_dir: Option<PathBuf>,

    /// YAML file of region profiles. Falls back to ECTD_PROFILES, then the
    /// built-in FDA/EMA/PMDA/HC table.
    #[arg(long, global = true, value_name = "PATH")]
    profiles: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble a sequence directory from a document inventory.
    Build(BuildArgs),

    /// Recompute a sequence's checksums and report tampering.
    Verify(VerifyArgs),

    /// Report mandatory modules a region requires but a sequence lacks.
    Validate(ValidateArgs),

    /// Generate the regional envelope of a built sequence.
    Envelope(EnvelopeArgs),

    /// Gateway acknowledgement tracking.
    Ack(AckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = match CliContext::resolve(cli.base_dir, cli.profiles) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };

    let result = match cli.command {
        Commands::Build(args) => run_build(&args, &ctx),
        Commands::Verify(args) => run_verify(&args, &ctx),
        Commands::Validate(args) => run_validate(&args, &ctx),
        Commands::Envelope(args) => run_envelope(&args, &ctx),
        Commands::Ack(args) => run_ack(&args, &ctx),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
