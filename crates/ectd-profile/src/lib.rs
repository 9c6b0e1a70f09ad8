//! # ectd-profile — Regional Submission Profiles
//!
//! Encodes what each regulatory authority requires of a sequence, separate
//! from the mechanics of building one:
//!
//! - **Profile** (`profile.rs`): one region's DTD version, mandatory module
//!   codes, module directory templates, document-type path templates, and
//!   the module directories that take part in lifecycle (delete) tracking.
//!
//! - **Registry** (`registry.rs`): the validated, read-only table of
//!   profiles keyed by [`RegionCode`](ectd_core::RegionCode). Built from the
//!   compiled-in defaults or from a YAML file, installed once per process.
//!
//! - **Rules** (`rules.rs`): the mandatory-module validator. Exact string
//!   match only; an unknown region is an error, never an empty rule set.
//!
//! ## Crate Policy
//!
//! - Depends only on `ectd-core` internally.
//! - Registry construction fails fast; lookups never default.

pub mod profile;
pub mod registry;
pub mod rules;

pub use profile::{ResolvedPath, SubmissionProfile};
pub use registry::{builtin_profiles, ProfileConfig, ProfileRegistry};
pub use rules::{check_modules, missing_modules, missing_modules_for_code, ModuleReport};
