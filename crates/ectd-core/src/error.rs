//! # Error Types — Structured Error Taxonomy
//!
//! Every fatal failure in the assembler, the profile registry, and the
//! acknowledgement tracker surfaces as an [`EctdError`]. Each variant maps
//! to a stable [`ErrorKind`] tag so that outer surfaces (CLI exit codes,
//! HTTP status codes) can classify an error without string matching, while
//! `Display` carries the human-readable detail.
//!
//! ## Design
//!
//! - Unknown regions, profiles, and sequences are `NotFound`, never an
//!   empty result.
//! - Unreadable documents are collected into a single `IoFailure` carrying
//!   the complete failing set, not just the first failure.
//! - Acknowledgement protocol violations keep the current state in the
//!   message so the caller can see what was rejected.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::DocumentId;

/// Convenience alias used across the workspace.
pub type Result<T, E = EctdError> = std::result::Result<T, E>;

/// Machine-readable classification of an [`EctdError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown region, profile, or sequence.
    NotFound,
    /// Malformed input (empty document set, unknown module code, ...).
    Validation,
    /// The target sequence already exists.
    Conflict,
    /// One or more documents could not be read.
    IoFailure,
    /// Acknowledgement event arrived out of order.
    InvalidTransition,
    /// Acknowledgement event arrived after a terminal state.
    AlreadyFinalized,
    /// Anything the caller cannot act on (filesystem, encoding).
    Internal,
}

impl ErrorKind {
    /// Returns the stable tag string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::IoFailure => "IO_FAILURE",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::AlreadyFinalized => "ALREADY_FINALIZED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single document that could not be read during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    /// Identifier of the failing document.
    pub document_id: DocumentId,
    /// Source path the assembler attempted to read.
    pub path: PathBuf,
    /// The underlying I/O error message.
    pub reason: String,
}

impl std::fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.document_id,
            self.path.display(),
            self.reason
        )
    }
}

fn list_failures(failures: &[DocumentFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level error type for eCTD sequence assembly.
#[derive(Error, Debug)]
pub enum EctdError {
    /// Unknown region, profile, or sequence.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// The sequence directory (or acknowledgement record) already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// One or more documents were unreadable. Carries the full failing set.
    #[error("{} document(s) could not be read: {}", .failures.len(), list_failures(.failures))]
    IoFailure {
        /// Every document that failed, in input order.
        failures: Vec<DocumentFailure>,
    },

    /// Acknowledgement event rejected for the current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Acknowledgement event on a terminal sequence.
    #[error("already finalized: {0}")]
    AlreadyFinalized(String),

    /// Filesystem error outside per-document reads.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// XML could not be read.
    #[error("xml error: {0}")]
    Xml(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl EctdError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::IoFailure { .. } => ErrorKind::IoFailure,
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
            Self::AlreadyFinalized(_) => ErrorKind::AlreadyFinalized,
            Self::Io(_) | Self::Xml(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}
