//! # Submission Profile
//!
//! One regulatory region's layout and completeness rules.
//!
//! ## Path Resolution
//!
//! A document's place in the sequence directory is decided here:
//!
//! - If its document type has a template in [`SubmissionProfile::document_types`],
//!   the template's `{file}` placeholder is replaced with the document's file
//!   name. Such documents are *index-eligible*: they get a `leaf` entry.
//! - Otherwise the document is a supporting file placed at
//!   `<module directory>/<file name>`. It is copied and checksummed but not
//!   indexed.
//!
//! Either way the module code must be known to the profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ectd_core::{Document, EctdError, RegionCode};

/// Placeholder substituted with the document file name in path templates.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Static configuration for one regulatory region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionProfile {
    /// The region this profile serves.
    pub region: RegionCode,
    /// Version of the regional DTD the index conforms to.
    pub dtd_version: String,
    /// Module codes every sequence must expose, in reporting order.
    pub mandatory_modules: Vec<String>,
    /// Module code → relative directory (e.g. `m2.5` → `m2/25-clin-over`).
    pub module_paths: BTreeMap<String, String>,
    /// Document type → relative path template containing `{file}`.
    #[serde(default)]
    pub document_types: BTreeMap<String, String>,
    /// Top-level module directories whose removals produce `delete` leaves.
    #[serde(default)]
    pub lifecycle_modules: Vec<String>,
    /// Root element name of the regional envelope.
    pub envelope_root: String,
}

/// Where a document lands in the sequence directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Relative path with `/` separators, e.g. `m1/1572.docx`.
    pub href: String,
    /// Whether the document gets an index `leaf`.
    pub indexed: bool,
}

impl SubmissionProfile {
    /// Whether `module_code` has a directory template.
    pub fn knows_module(&self, module_code: &str) -> bool {
        self.module_paths.contains_key(module_code)
    }

    /// The relative directory for a module code.
    pub fn module_directory(&self, module_code: &str) -> Option<&str> {
        self.module_paths.get(module_code).map(String::as_str)
    }

    /// Resolve the relative path of `document` under this profile.
    pub fn resolve(&self, document: &Document) -> Result<ResolvedPath, EctdError> {
        let module_dir = self.module_directory(&document.module_code).ok_or_else(|| {
            EctdError::Validation(format!(
                "document {} has module code {:?}, which is not defined for region {}",
                document.id, document.module_code, self.region
            ))
        })?;
        let file_name = document.file_name()?;

        let template = document
            .document_type
            .as_deref()
            .and_then(|t| self.document_types.get(t));

        let resolved = match template {
            Some(template) => ResolvedPath {
                href: template.replace(FILE_PLACEHOLDER, file_name),
                indexed: true,
            },
            None => ResolvedPath {
                href: format!("{}/{}", module_dir.trim_end_matches('/'), file_name),
                indexed: false,
            },
        };
        validate_relative_path(&resolved.href)?;
        Ok(resolved)
    }

    /// Whether a relative path falls under a lifecycle-tracked module.
    pub fn tracks_lifecycle(&self, href: &str) -> bool {
        let top = href.split('/').next().unwrap_or_default();
        self.lifecycle_modules.iter().any(|m| m == top)
    }
}

/// Reject paths that would escape or confuse the sequence directory.
pub(crate) fn validate_relative_path(path: &str) -> Result<(), EctdError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(EctdError::Validation(format!(
            "relative path {path:?} is not a clean forward-slash path"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ectd_core::DocumentId;

    fn profile() -> SubmissionProfile {
        SubmissionProfile {
            region: RegionCode::Fda,
            dtd_version: "3.3".to_string(),
            mandatory_modules: vec!["m1".to_string()],
            module_paths: BTreeMap::from([
                ("m1".to_string(), "m1".to_string()),
                ("m2.5".to_string(), "m2/25-clin-over/".to_string()),
            ]),
            document_types: BTreeMap::from([(
                "form-1572".to_string(),
                "m1/{file}".to_string(),
            )]),
            lifecycle_modules: vec!["m2".to_string()],
            envelope_root: "fda-regional".to_string(),
        }
    }

    fn doc(module: &str, path: &str) -> Document {
        Document::new(DocumentId::new("d").unwrap(), "T", module, path)
    }

    #[test]
    fn mapped_document_type_is_indexed() {
        let d = doc("m1", "/store/1572.docx").with_document_type("form-1572");
        let r = profile().resolve(&d).unwrap();
        assert_eq!(r.href, "m1/1572.docx");
        assert!(r.indexed);
    }

    #[test]
    fn unmapped_document_is_supporting_file() {
        let r = profile().resolve(&doc("m1", "/store/1571.docx")).unwrap();
        assert_eq!(r.href, "m1/1571.docx");
        assert!(!r.indexed);

        let d = doc("m1", "/store/x.pdf").with_document_type("unknown-type");
        assert!(!profile().resolve(&d).unwrap().indexed);
    }

    #[test]
    fn module_directory_trailing_slash_is_ignored() {
        let r = profile().resolve(&doc("m2.5", "/s/overview.pdf")).unwrap();
        assert_eq!(r.href, "m2/25-clin-over/overview.pdf");
    }

    #[test]
    fn unknown_module_code_is_rejected() {
        let err = profile().resolve(&doc("m9", "/s/x.pdf")).unwrap_err();
        assert_eq!(err.kind(), ectd_core::ErrorKind::Validation);
    }

    #[test]
    fn lifecycle_tracking_uses_top_level_directory() {
        let p = profile();
        assert!(p.tracks_lifecycle("m2/25-clin-over/a.pdf"));
        assert!(!p.tracks_lifecycle("m1/a.pdf"));
        assert!(!p.tracks_lifecycle("m20/a.pdf"));
    }

    #[test]
    fn relative_path_validation() {
        assert!(validate_relative_path("m1/a.pdf").is_ok());
        assert!(validate_relative_path("/m1/a.pdf").is_err());
        assert!(validate_relative_path("m1/../a.pdf").is_err());
        assert!(validate_relative_path("m1//a.pdf").is_err());
        assert!(validate_relative_path("").is_err());
    }
}
