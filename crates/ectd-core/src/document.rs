//! # Documents
//!
//! A [`Document`] is a unit of regulatory content owned by the external
//! document store. The assembler consumes documents read-only; the only
//! mutation the core performs is attaching a computed digest to a copy for
//! audit purposes ([`Document::with_digest`]).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::error::EctdError;
use crate::identity::DocumentId;
use crate::temporal::Timestamp;

/// Approval lifecycle status assigned by the external workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Awaiting review.
    Pending,
    /// Approved for submission.
    Approved,
    /// Failed quality control.
    QcFailed,
    /// Rejected by the reviewer.
    Rejected,
}

impl DocumentStatus {
    /// The wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::QcFailed => "qc_failed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = EctdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "qc_failed" => Ok(Self::QcFailed),
            "rejected" => Ok(Self::Rejected),
            other => Err(EctdError::Validation(format!(
                "unknown document status {other:?}"
            ))),
        }
    }
}

/// A document candidate for inclusion in a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier in the external document store.
    pub id: DocumentId,
    /// Human-readable title, emitted as the leaf `<title>`.
    pub title: String,
    /// CTD module code, e.g. `m1` or `m2.5`.
    pub module_code: String,
    /// Location of the document bytes on the local filesystem.
    pub file_path: PathBuf,
    /// Document type (e.g. `form-1572`). Documents whose type has a path
    /// template in the target profile are indexed; others are carried as
    /// supporting files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    /// Digest attached after assembly, for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<ContentDigest>,
    /// Approval status.
    pub status: DocumentStatus,
    /// When the document was created upstream.
    #[serde(default = "Timestamp::now")]
    pub created_at: Timestamp,
    /// When the document was last changed upstream.
    #[serde(default = "Timestamp::now")]
    pub updated_at: Timestamp,
}

impl Document {
    /// Create a pending document with no document type.
    pub fn new(
        id: DocumentId,
        title: impl Into<String>,
        module_code: impl Into<String>,
        file_path: impl Into<PathBuf>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            title: title.into(),
            module_code: module_code.into(),
            file_path: file_path.into(),
            document_type: None,
            digest: None,
            status: DocumentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the approval status.
    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the document type used for path-template lookup.
    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    /// Attach a computed digest.
    pub fn with_digest(mut self, digest: ContentDigest) -> Self {
        self.digest = Some(digest);
        self
    }

    /// The file name component of [`Document::file_path`].
    pub fn file_name(&self) -> Result<&str, EctdError> {
        self.file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                EctdError::Validation(format!(
                    "document {} has no usable file name: {}",
                    self.id,
                    self.file_path.display()
                ))
            })
    }

    /// Whether the module code equals `prefix` or is a sub-section of it
    /// (`m2` covers `m2` and `m2.5`, not `m20`).
    pub fn in_module(&self, prefix: &str) -> bool {
        match self.module_code.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}
