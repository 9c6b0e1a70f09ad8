//! Regional completeness of a built sequence.

use ectd_core::EctdError;
use ectd_profile::{check_modules, ModuleReport, ProfileRegistry};

use crate::assembler::SequenceBuildResult;

/// Check the module set of `sequence` against its region's mandatory list.
pub fn check_sequence(
    registry: &ProfileRegistry,
    sequence: &SequenceBuildResult,
) -> Result<ModuleReport, EctdError> {
    let report = check_modules(registry, sequence.region, sequence.module_codes())?;
    if report.is_complete() {
        tracing::info!(sequence = %sequence.key, region = %sequence.region, "sequence is complete");
    } else {
        tracing::warn!(
            sequence = %sequence.key,
            region = %sequence.region,
            missing = ?report.missing,
            "sequence is missing mandatory modules"
        );
    }
    Ok(report)
}
