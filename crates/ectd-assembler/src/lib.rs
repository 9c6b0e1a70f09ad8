//! # ectd-assembler — Sequence Assembly
//!
//! Turns a set of approved documents into an immutable eCTD sequence
//! directory:
//!
//! ```text
//! <base>/<submission>/<sequence>/
//!     m1/...                 copied documents
//!     index.xml              lifecycle index (leaf per indexed document)
//!     checksum.md5           "<md5>  <path>" per copied file, sorted by path
//! ```
//!
//! ## Modules
//!
//! - [`inventory`]: the document-store seam and the inventory collector.
//! - [`manifest`]: index and checksum manifest rendering and parsing.
//! - [`prior`]: the previous sequence's state, used for delta operations.
//! - [`assembler`]: the build pipeline (validate, digest, stage, rename).
//! - [`verify`]: recompute an existing sequence's digests.
//! - [`envelope`]: regional envelope metadata for a built sequence.
//!
//! ## Crate Policy
//!
//! - A sequence directory is created exactly once and never modified.
//! - All filesystem writes happen in a staging directory that is renamed
//!   into place as the final step.
//! - No `.unwrap()` outside tests.

pub mod assembler;
pub mod compliance;
pub mod envelope;
pub mod inventory;
pub mod lock;
pub mod manifest;
pub mod prior;
pub mod verify;

pub use assembler::{
    module_set, BuildRequest, CopiedFile, SequenceAssembler, SequenceBuildResult,
    BUILD_RECORD_SUFFIX, CHECKSUM_FILE, INDEX_FILE,
};
pub use compliance::check_sequence;
pub use envelope::{build_envelope, ApplicantMeta, Envelope, EnvelopeHeader, InventoryItem, ProcedureMeta};
pub use inventory::{collect, DocumentStore, InventoryFileStore, InventoryFilter, MemoryStore};
pub use lock::SubmissionLocks;
pub use manifest::{IndexEntry, Operation};
pub use prior::{PriorEntry, PriorSequenceIndex};
pub use verify::{verify_sequence, DigestMismatch, VerificationReport};
