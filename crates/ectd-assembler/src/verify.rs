//! # Sequence Verification
//!
//! Recomputes every digest listed in a sequence's `checksum.md5` and
//! cross-checks the index leaves against it. A sequence that passes is
//! byte-for-byte what the assembler wrote.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use ectd_core::{digest_file, ContentDigest, EctdError};

use crate::assembler::{CHECKSUM_FILE, INDEX_FILE};
use crate::manifest::{parse_checksum_manifest, parse_index, Operation};

/// A listed file whose bytes no longer match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestMismatch {
    pub href: String,
    pub expected: ContentDigest,
    pub actual: ContentDigest,
}

/// Outcome of [`verify_sequence`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub sequence_dir: PathBuf,
    /// Files listed in the checksum manifest.
    pub checked: usize,
    pub mismatched: Vec<DigestMismatch>,
    /// Listed but absent from disk.
    pub missing: Vec<String>,
    /// Present on disk but not listed.
    pub unlisted: Vec<String>,
    /// Index leaves whose path or checksum disagrees with the checksum
    /// manifest.
    pub index_mismatches: Vec<String>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty()
            && self.missing.is_empty()
            && self.unlisted.is_empty()
            && self.index_mismatches.is_empty()
    }
}

enum FileCheck {
    Ok,
    Missing,
    Mismatch(ContentDigest),
}

/// Verify the sequence directory at `sequence_dir`.
pub fn verify_sequence(sequence_dir: &Path) -> Result<VerificationReport, EctdError> {
    let checksum_path = sequence_dir.join(CHECKSUM_FILE);
    let listed = match std::fs::read_to_string(&checksum_path) {
        Ok(text) => parse_checksum_manifest(&text)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EctdError::NotFound(format!(
                "{} is not a sequence directory: no {CHECKSUM_FILE}",
                sequence_dir.display()
            )))
        }
        Err(e) => return Err(e.into()),
    };
    let listed: BTreeMap<String, ContentDigest> = listed.into_iter().collect();

    let checks: Vec<(String, ContentDigest, std::io::Result<FileCheck>)> = listed
        .par_iter()
        .map(|(href, expected)| {
            let outcome = match digest_file(&sequence_dir.join(href)) {
                Ok(actual) if actual == *expected => Ok(FileCheck::Ok),
                Ok(actual) => Ok(FileCheck::Mismatch(actual)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileCheck::Missing),
                Err(e) => Err(e),
            };
            (href.clone(), *expected, outcome)
        })
        .collect();

    let mut report = VerificationReport {
        sequence_dir: sequence_dir.to_path_buf(),
        checked: listed.len(),
        ..Default::default()
    };
    for (href, expected, outcome) in checks {
        match outcome? {
            FileCheck::Ok => {}
            FileCheck::Missing => report.missing.push(href),
            FileCheck::Mismatch(actual) => report.mismatched.push(DigestMismatch {
                href,
                expected,
                actual,
            }),
        }
    }

    for entry in WalkDir::new(sequence_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| EctdError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(sequence_dir) else {
            continue;
        };
        let href = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if href == INDEX_FILE || href == CHECKSUM_FILE {
            continue;
        }
        if !listed.contains_key(&href) {
            report.unlisted.push(href);
        }
    }

    match std::fs::read_to_string(sequence_dir.join(INDEX_FILE)) {
        Ok(xml) => {
            for leaf in parse_index(&xml)? {
                if leaf.operation == Operation::Delete {
                    continue;
                }
                if listed.get(&leaf.href) != Some(&leaf.checksum) {
                    report.index_mismatches.push(leaf.href);
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            report.index_mismatches.push(INDEX_FILE.to_string());
        }
        Err(e) => return Err(e.into()),
    }

    if report.is_clean() {
        tracing::info!(dir = %sequence_dir.display(), files = report.checked, "sequence verified");
    } else {
        tracing::warn!(
            dir = %sequence_dir.display(),
            mismatched = report.mismatched.len(),
            missing = report.missing.len(),
            unlisted = report.unlisted.len(),
            index_mismatches = report.index_mismatches.len(),
            "sequence verification failed"
        );
    }
    Ok(report)
}
