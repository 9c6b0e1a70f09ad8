//! # Region Rule Validator
//!
//! Answers one question: which of a region's mandatory modules does a
//! sequence fail to expose?
//!
//! The answer is the profile's mandatory list, in declared order, minus the
//! present set. Matching is exact string equality on module code: `m2.5`
//! does not satisfy `m2.7`, and `m2.5` does not satisfy `m2`. An unknown
//! region is an error, never "no requirements".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use ectd_core::{EctdError, RegionCode};

use crate::registry::ProfileRegistry;

/// Result of checking a module set against a region's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReport {
    /// The region checked.
    pub region: RegionCode,
    /// The profile's DTD version.
    pub dtd_version: String,
    /// Module codes that were present, sorted.
    pub present: Vec<String>,
    /// Mandatory module codes that were missing, in declared order.
    pub missing: Vec<String>,
}

impl ModuleReport {
    /// Whether every mandatory module is present.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Mandatory modules of `region` that are absent from `present`.
pub fn missing_modules<I, S>(
    registry: &ProfileRegistry,
    region: RegionCode,
    present: I,
) -> Result<Vec<String>, EctdError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(check_modules(registry, region, present)?.missing)
}

/// As [`missing_modules`], parsing the region code first.
pub fn missing_modules_for_code<I, S>(
    registry: &ProfileRegistry,
    region_code: &str,
    present: I,
) -> Result<Vec<String>, EctdError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    missing_modules(registry, region_code.parse()?, present)
}

/// Full report for `present` against `region`'s profile.
pub fn check_modules<I, S>(
    registry: &ProfileRegistry,
    region: RegionCode,
    present: I,
) -> Result<ModuleReport, EctdError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let profile = registry.profile_for(region)?;
    let present: BTreeSet<String> = present
        .into_iter()
        .map(|m| m.as_ref().to_string())
        .collect();
    let missing: Vec<String> = profile
        .mandatory_modules
        .iter()
        .filter(|m| !present.contains(m.as_str()))
        .cloned()
        .collect();

    if !missing.is_empty() {
        tracing::debug!(region = %region, missing = ?missing, "mandatory modules missing");
    }

    Ok(ModuleReport {
        region,
        dtd_version: profile.dtd_version.clone(),
        present: present.into_iter().collect(),
        missing,
    })
}
