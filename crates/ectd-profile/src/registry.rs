//! # Profile Registry
//!
//! The read-only table of [`SubmissionProfile`]s keyed by region.
//!
//! ## Construction
//!
//! [`ProfileRegistry::new`] validates every profile and fails fast on:
//! - a duplicate region code,
//! - an empty mandatory-module list,
//! - a mandatory module with no directory template,
//! - a document-type template without the `{file}` placeholder,
//! - an empty envelope root element.
//!
//! ## Process-Wide Instance
//!
//! Profiles are loaded once at startup. [`ProfileRegistry::install_global`]
//! installs a registry for the life of the process; [`ProfileRegistry::global`]
//! returns it, falling back to [`ProfileRegistry::builtin`] when nothing was
//! installed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use ectd_core::{EctdError, RegionCode};

use crate::profile::{validate_relative_path, SubmissionProfile, FILE_PLACEHOLDER};

static GLOBAL: OnceLock<ProfileRegistry> = OnceLock::new();

/// On-disk layout of a profile configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// One entry per region.
    pub profiles: Vec<SubmissionProfile>,
}

/// Validated lookup table of submission profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRegistry {
    profiles: BTreeMap<RegionCode, SubmissionProfile>,
}

impl ProfileRegistry {
    /// Build a registry, rejecting invalid or duplicate profiles.
    pub fn new(profiles: Vec<SubmissionProfile>) -> Result<Self, EctdError> {
        let mut table = BTreeMap::new();
        for profile in profiles {
            validate_profile(&profile)?;
            let region = profile.region;
            if table.insert(region, profile).is_some() {
                return Err(EctdError::Validation(format!(
                    "duplicate profile for region {region}"
                )));
            }
        }
        Ok(Self { profiles: table })
    }

    /// The compiled-in FDA, EMA, PMDA, and HC profiles.
    pub fn builtin() -> Self {
        let profiles = builtin_profiles()
            .into_iter()
            .map(|p| (p.region, p))
            .collect();
        Self { profiles }
    }

    /// Parse a YAML profile configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, EctdError> {
        let config: ProfileConfig = serde_yaml::from_str(yaml)
            .map_err(|e| EctdError::Validation(format!("invalid profile configuration: {e}")))?;
        Self::new(config.profiles)
    }

    /// Load a YAML profile configuration from disk.
    pub fn load(path: &Path) -> Result<Self, EctdError> {
        let yaml = std::fs::read_to_string(path)?;
        let registry = Self::from_yaml_str(&yaml)?;
        tracing::info!(
            path = %path.display(),
            regions = registry.profiles.len(),
            "loaded submission profiles"
        );
        Ok(registry)
    }

    /// Look up the profile for `region`.
    pub fn profile_for(&self, region: RegionCode) -> Result<&SubmissionProfile, EctdError> {
        self.profiles.get(&region).ok_or_else(|| {
            EctdError::NotFound(format!("no submission profile configured for region {region}"))
        })
    }

    /// Parse `code` and look up its profile.
    pub fn profile_for_code(&self, code: &str) -> Result<&SubmissionProfile, EctdError> {
        self.profile_for(code.parse()?)
    }

    /// Regions with a configured profile.
    pub fn regions(&self) -> impl Iterator<Item = RegionCode> + '_ {
        self.profiles.keys().copied()
    }

    /// Install `registry` as the process-wide instance.
    ///
    /// Fails with `Conflict` if a registry was already installed, or if
    /// [`global`](Self::global) already fell back to the built-in table.
    pub fn install_global(registry: ProfileRegistry) -> Result<&'static ProfileRegistry, EctdError> {
        GLOBAL.set(registry).map_err(|_| {
            EctdError::Conflict("a process-wide profile registry is already installed".to_string())
        })?;
        Ok(Self::global())
    }

    /// The process-wide registry.
    pub fn global() -> &'static ProfileRegistry {
        GLOBAL.get_or_init(Self::builtin)
    }
}

fn validate_profile(profile: &SubmissionProfile) -> Result<(), EctdError> {
    let region = profile.region;
    if profile.mandatory_modules.is_empty() {
        return Err(EctdError::Validation(format!(
            "profile {region} has an empty mandatory module list"
        )));
    }
    if profile.dtd_version.trim().is_empty() {
        return Err(EctdError::Validation(format!(
            "profile {region} has no DTD version"
        )));
    }
    if profile.envelope_root.trim().is_empty() {
        return Err(EctdError::Validation(format!(
            "profile {region} has no envelope root element"
        )));
    }
    let mut seen = BTreeSet::new();
    for module in &profile.mandatory_modules {
        if !seen.insert(module.as_str()) {
            return Err(EctdError::Validation(format!(
                "profile {region} lists mandatory module {module:?} twice"
            )));
        }
        if !profile.knows_module(module) {
            return Err(EctdError::Validation(format!(
                "profile {region} requires module {module:?} but defines no directory for it"
            )));
        }
    }
    for (module, dir) in &profile.module_paths {
        validate_relative_path(dir.trim_end_matches('/')).map_err(|e| {
            EctdError::Validation(format!("profile {region}, module {module:?}: {e}"))
        })?;
    }
    for (doc_type, template) in &profile.document_types {
        if !template.contains(FILE_PLACEHOLDER) {
            return Err(EctdError::Validation(format!(
                "profile {region}, document type {doc_type:?}: template {template:?} lacks {FILE_PLACEHOLDER}"
            )));
        }
    }
    Ok(())
}

fn paths(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn modules(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

/// Common Technical Document modules 2–5 share one layout across regions.
const CTD_MODULE_PATHS: &[(&str, &str)] = &[
    ("m1", "m1"),
    ("m2", "m2"),
    ("m2.2", "m2/22-intro"),
    ("m2.3", "m2/23-qos"),
    ("m2.4", "m2/24-nonclin-over"),
    ("m2.5", "m2/25-clin-over"),
    ("m2.6", "m2/26-nonclin-sum"),
    ("m2.7", "m2/27-clin-sum"),
    ("m3", "m3"),
    ("m3.2", "m3/32-body-data"),
    ("m3.3", "m3/33-lit-ref"),
    ("m4", "m4"),
    ("m4.2", "m4/42-stud-rep"),
    ("m4.3", "m4/43-lit-ref"),
    ("m5", "m5"),
    ("m5.2", "m5/52-tab-list"),
    ("m5.3", "m5/53-clin-stud-rep"),
    ("m5.4", "m5/54-lit-ref"),
];

const CTD_DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("introduction", "m2/22-intro/{file}"),
    ("quality-overall-summary", "m2/23-qos/{file}"),
    ("nonclinical-overview", "m2/24-nonclin-over/{file}"),
    ("clinical-overview", "m2/25-clin-over/{file}"),
    ("nonclinical-summary", "m2/26-nonclin-sum/{file}"),
    ("clinical-summary", "m2/27-clin-sum/{file}"),
    ("drug-substance", "m3/32-body-data/32s-drug-sub/{file}"),
    ("drug-product", "m3/32-body-data/32p-drug-prod/{file}"),
    ("nonclinical-study-report", "m4/42-stud-rep/{file}"),
    ("clinical-study-report", "m5/53-clin-stud-rep/{file}"),
    ("case-report-forms", "m5/53-clin-stud-rep/537-crf-ipl/{file}"),
];

fn ctd_profile(
    region: RegionCode,
    dtd_version: &str,
    regional: &[(&str, &str)],
    envelope_root: &str,
) -> SubmissionProfile {
    let mut document_types = paths(CTD_DOCUMENT_TYPES);
    document_types.extend(paths(regional));
    SubmissionProfile {
        region,
        dtd_version: dtd_version.to_string(),
        mandatory_modules: modules(&["m1", "m2", "m3", "m4", "m5"]),
        module_paths: paths(CTD_MODULE_PATHS),
        document_types,
        lifecycle_modules: modules(&["m1", "m2", "m3", "m4", "m5"]),
        envelope_root: envelope_root.to_string(),
    }
}

/// The compiled-in profile table.
pub fn builtin_profiles() -> Vec<SubmissionProfile> {
    vec![
        ctd_profile(
            RegionCode::Fda,
            "3.3",
            &[
                ("cover-letter", "m1/{file}"),
                ("form-356h", "m1/{file}"),
                ("form-1572", "m1/{file}"),
                ("product-labeling", "m1/{file}"),
            ],
            "fda-regional",
        ),
        ctd_profile(
            RegionCode::Ema,
            "3.0.4",
            &[
                ("cover-letter", "m1/{file}"),
                ("application-form", "m1/{file}"),
                ("product-information", "m1/{file}"),
            ],
            "eu-envelope",
        ),
        ctd_profile(
            RegionCode::Pmda,
            "1.0",
            &[
                ("cover-letter", "m1/{file}"),
                ("approval-application", "m1/{file}"),
            ],
            "jp-envelope",
        ),
        ctd_profile(
            RegionCode::Hc,
            "2.2",
            &[
                ("cover-letter", "m1/{file}"),
                ("hc-3011", "m1/{file}"),
                ("product-monograph", "m1/{file}"),
            ],
            "hc-regional",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ectd_core::ErrorKind;

    fn minimal(region: RegionCode, mandatory: &[&str]) -> SubmissionProfile {
        SubmissionProfile {
            region,
            dtd_version: "1.0".to_string(),
            mandatory_modules: modules(mandatory),
            module_paths: paths(&[("m1", "m1"), ("m2", "m2"), ("m3", "m3")]),
            document_types: BTreeMap::new(),
            lifecycle_modules: Vec::new(),
            envelope_root: "envelope".to_string(),
        }
    }

    #[test]
    fn builtin_profiles_pass_validation() {
        let registry = ProfileRegistry::new(builtin_profiles()).unwrap();
        assert_eq!(registry, ProfileRegistry::builtin());
        let regions: Vec<_> = registry.regions().collect();
        assert_eq!(regions, RegionCode::ALL.to_vec());
    }

    #[test]
    fn duplicate_region_rejected() {
        let err = ProfileRegistry::new(vec![
            minimal(RegionCode::Fda, &["m1"]),
            minimal(RegionCode::Fda, &["m2"]),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn empty_mandatory_list_rejected() {
        let err = ProfileRegistry::new(vec![minimal(RegionCode::Ema, &[])]).unwrap_err();
        assert!(err.to_string().contains("empty mandatory module list"));
    }

    #[test]
    fn mandatory_module_without_directory_rejected() {
        let err = ProfileRegistry::new(vec![minimal(RegionCode::Ema, &["m4"])]).unwrap_err();
        assert!(err.to_string().contains("m4"));
    }

    #[test]
    fn template_without_placeholder_rejected() {
        let mut p = minimal(RegionCode::Hc, &["m1"]);
        p.document_types
            .insert("cover-letter".to_string(), "m1/cover.pdf".to_string());
        assert!(ProfileRegistry::new(vec![p]).is_err());
    }

    #[test]
    fn unconfigured_region_is_not_found() {
        let registry = ProfileRegistry::new(vec![minimal(RegionCode::Fda, &["m1"])]).unwrap();
        assert!(registry.profile_for(RegionCode::Fda).is_ok());
        let err = registry.profile_for(RegionCode::Pmda).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = registry.profile_for_code("XYZ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn yaml_configuration_parses() {
        let yaml = r#"
profiles:
  - region: FDA
    dtd_version: "3.3"
    mandatory_modules: [m1, m2, m3]
    module_paths:
      m1: m1
      m2: m2
      m3: m3
    document_types:
      form-1572: "m1/{file}"
    lifecycle_modules: [m1]
    envelope_root: fda-regional
"#;
        let registry = ProfileRegistry::from_yaml_str(yaml).unwrap();
        let fda = registry.profile_for(RegionCode::Fda).unwrap();
        assert_eq!(fda.mandatory_modules, vec!["m1", "m2", "m3"]);
        assert_eq!(fda.document_types["form-1572"], "m1/{file}");
    }

    #[test]
    fn malformed_yaml_is_validation_error() {
        let err = ProfileRegistry::from_yaml_str("profiles: [{region: MARS}]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn global_registry_is_stable() {
        let a = ProfileRegistry::global() as *const ProfileRegistry;
        let b = ProfileRegistry::global() as *const ProfileRegistry;
        assert_eq!(a, b);
        assert!(ProfileRegistry::install_global(ProfileRegistry::builtin()).is_err());
    }
}
