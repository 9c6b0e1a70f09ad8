//! # Prior Sequence Index
//!
//! The state of the immediately preceding sequence, as far as delta
//! operations need it: every relative path it carried, that path's digest,
//! and (for indexed documents) its title.
//!
//! The checksum manifest is the complete file snapshot; the index manifest
//! only contributes titles. Paths present in the index but absent from the
//! checksum manifest (delete leaves) are not part of the snapshot.
//!
//! An indexed document that was unchanged in a sequence has no leaf there,
//! so its title lives in an older sequence's index. [`PriorSequenceIndex::load_chain`]
//! walks back through earlier sequences until every indexed path has its
//! title again.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use ectd_core::{ContentDigest, EctdError, SequenceNumber};

use crate::assembler::{SequenceBuildResult, CHECKSUM_FILE, INDEX_FILE};
use crate::manifest::{parse_checksum_manifest, parse_index, Operation};

/// A single file of the prior sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorEntry {
    pub checksum: ContentDigest,
    /// Leaf title, when the file was indexed.
    pub title: Option<String>,
}

/// Path → digest snapshot of a previously built sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorSequenceIndex {
    sequence_number: Option<SequenceNumber>,
    entries: BTreeMap<String, PriorEntry>,
}

impl PriorSequenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record which sequence this snapshot came from. Builds refuse a prior
    /// whose number is not lower than the sequence being built.
    pub fn with_sequence_number(mut self, number: SequenceNumber) -> Self {
        self.sequence_number = Some(number);
        self
    }

    pub fn sequence_number(&self) -> Option<SequenceNumber> {
        self.sequence_number
    }

    /// Add or overwrite a path.
    pub fn insert(&mut self, href: impl Into<String>, checksum: ContentDigest, title: Option<String>) {
        self.entries
            .insert(href.into(), PriorEntry { checksum, title });
    }

    pub fn get(&self, href: &str) -> Option<&PriorEntry> {
        self.entries.get(href)
    }

    pub fn contains(&self, href: &str) -> bool {
        self.entries.contains_key(href)
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PriorEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build from manifest contents.
    pub fn from_manifests(checksum_md5: &str, index_xml: Option<&str>) -> Result<Self, EctdError> {
        let mut prior = Self::new();
        for (href, checksum) in parse_checksum_manifest(checksum_md5)? {
            prior.insert(href, checksum, None);
        }
        if let Some(xml) = index_xml {
            for leaf in parse_index(xml)? {
                if leaf.operation == Operation::Delete {
                    continue;
                }
                if let Some(entry) = prior.entries.get_mut(&leaf.href) {
                    entry.title = Some(leaf.title);
                }
            }
        }
        Ok(prior)
    }

    /// Load the snapshot of an on-disk sequence directory. The directory
    /// name, when it is a four-digit sequence number, is recorded.
    pub fn load(sequence_dir: &Path) -> Result<Self, EctdError> {
        let checksum_path = sequence_dir.join(CHECKSUM_FILE);
        let checksum_md5 = match std::fs::read_to_string(&checksum_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EctdError::NotFound(format!(
                    "prior sequence {} has no {CHECKSUM_FILE}",
                    sequence_dir.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let index_xml = match std::fs::read_to_string(sequence_dir.join(INDEX_FILE)) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let mut prior = Self::from_manifests(&checksum_md5, index_xml.as_deref())?;
        prior.sequence_number = sequence_dir
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| SequenceNumber::parse(n).ok());

        tracing::debug!(
            dir = %sequence_dir.display(),
            files = prior.len(),
            "loaded prior sequence index"
        );
        Ok(prior)
    }

    /// Snapshot of the newest sequence in `sequence_dirs` (newest first),
    /// with titles for paths left out of its index taken from the most
    /// recent older index that carried a leaf for them. A `delete` leaf in
    /// a newer index ends the search for that path.
    pub fn load_chain(sequence_dirs: &[PathBuf]) -> Result<Option<Self>, EctdError> {
        let Some((newest, older)) = sequence_dirs.split_first() else {
            return Ok(None);
        };
        let mut prior = Self::load(newest)?;
        let mut settled: HashSet<String> = prior
            .entries
            .iter()
            .filter(|(_, e)| e.title.is_some())
            .map(|(href, _)| href.clone())
            .collect();

        for dir in older {
            if settled.len() == prior.entries.len() {
                break;
            }
            let index_xml = match std::fs::read_to_string(dir.join(INDEX_FILE)) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            for leaf in parse_index(&index_xml)? {
                if settled.contains(&leaf.href) {
                    continue;
                }
                let Some(entry) = prior.entries.get_mut(&leaf.href) else {
                    continue;
                };
                if leaf.operation != Operation::Delete {
                    entry.title = Some(leaf.title);
                }
                settled.insert(leaf.href);
            }
        }

        tracing::debug!(
            sequences = sequence_dirs.len(),
            indexed = prior.entries.values().filter(|e| e.title.is_some()).count(),
            "resolved prior titles across sequences"
        );
        Ok(Some(prior))
    }

    /// Snapshot of a sequence just built in this process. Every indexed
    /// file carries its document's title, whether or not it had a leaf.
    pub fn from_build(result: &SequenceBuildResult) -> Self {
        let titles: BTreeMap<&str, &str> = result
            .documents
            .iter()
            .map(|d| (d.id.as_str(), d.title.as_str()))
            .collect();
        let mut prior = Self::new().with_sequence_number(result.key.sequence_number);
        for file in &result.files {
            let title = if file.indexed {
                titles.get(file.document_id.as_str()).map(|t| t.to_string())
            } else {
                None
            };
            prior.insert(file.href.clone(), file.checksum, title);
        }
        prior
    }
}
