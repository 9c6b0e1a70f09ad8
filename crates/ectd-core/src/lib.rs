//! # ectd-core — Foundational Types for eCTD Sequence Assembly
//!
//! This crate is the leaf of the workspace dependency graph. It defines the
//! primitives every other crate shares when building, validating, and
//! tracking an eCTD submission sequence.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `SubmissionId`, `SequenceNumber`,
//!    `SequenceKey`, `DocumentId` — validated at construction. A submission
//!    identifier doubles as a directory name, so path separators and dot
//!    segments are rejected up front.
//!
//! 2. **One checksum engine.** Every digest in an index or checksum manifest
//!    is produced by [`digest()`] or [`digest_file()`]. The wire format
//!    is lowercase MD5 hex; the manifest marker is [`CHECKSUM_TYPE`].
//!
//! 3. **Enumerated regions.** [`RegionCode`] is a closed enum. An unknown
//!    region string is a `NotFound` error, never an empty rule set.
//!
//! 4. **One XML writer.** Manifests and envelopes are built as
//!    [`xml::XmlElement`] trees and serialized by [`xml::XmlDocument`], so
//!    attribute order and whitespace are decided in exactly one place.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ectd-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod document;
pub mod error;
pub mod identity;
pub mod region;
pub mod temporal;
pub mod xml;

// Re-export primary types for ergonomic imports.
pub use digest::{digest, digest_file, digest_reader, ContentDigest, CHECKSUM_TYPE};
pub use document::{Document, DocumentStatus};
pub use error::{DocumentFailure, EctdError, ErrorKind, Result};
pub use identity::{DocumentId, SequenceKey, SequenceNumber, SubmissionId};
pub use region::RegionCode;
pub use temporal::Timestamp;
pub use xml::{XmlDocument, XmlElement, XmlNode};
