//! # Sequence Assembler
//!
//! One call to [`SequenceAssembler::build`] produces one immutable sequence
//! directory, or nothing at all.
//!
//! ## Pipeline
//!
//! 1. Take the submission's lock and refuse an existing sequence directory.
//! 2. Validate: non-empty document set, prior older than this sequence,
//!    module codes known to the region, unique target paths.
//! 3. Copy every document into a staging directory and digest the staged
//!    bytes, in parallel. Every unreadable document is collected into a
//!    single `IoFailure`.
//! 4. Sort by (module code, title, target path, document id).
//! 5. Decide operations against the prior snapshot and synthesize delete
//!    leaves for lifecycle-tracked paths that disappeared.
//! 6. Write `index.xml` and `checksum.md5` into staging, then rename the
//!    staging directory to `<base>/<submission>/<sequence>`.
//!
//! The staging directory is a [`tempfile::TempDir`]: any early return drops
//! it and removes everything staged so far.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use ectd_core::{
    digest_file, ContentDigest, Document, DocumentFailure, DocumentId, EctdError, RegionCode,
    SequenceKey, SequenceNumber, SubmissionId, Timestamp,
};
use ectd_profile::{ProfileRegistry, ResolvedPath, SubmissionProfile};

use crate::lock::SubmissionLocks;
use crate::manifest::{render_checksum_manifest, render_index, IndexEntry, Operation};
use crate::prior::PriorSequenceIndex;

/// File name of the index manifest inside a sequence directory.
pub const INDEX_FILE: &str = "index.xml";
/// File name of the checksum manifest inside a sequence directory.
pub const CHECKSUM_FILE: &str = "checksum.md5";

/// Suffix of the build record written beside a sequence directory.
pub const BUILD_RECORD_SUFFIX: &str = ".build.json";

const STAGING_PREFIX: &str = ".staging-";

/// Input to a single build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub submission_id: SubmissionId,
    pub sequence_number: SequenceNumber,
    pub region: RegionCode,
    pub documents: Vec<Document>,
    /// Snapshot of the immediately preceding sequence, if any.
    pub prior: Option<PriorSequenceIndex>,
    /// Emit unchanged indexed documents as `replace` instead of omitting them.
    pub force_include_unchanged: bool,
}

impl BuildRequest {
    pub fn new(
        submission_id: SubmissionId,
        sequence_number: SequenceNumber,
        region: RegionCode,
        documents: Vec<Document>,
    ) -> Self {
        Self {
            submission_id,
            sequence_number,
            region,
            documents,
            prior: None,
            force_include_unchanged: false,
        }
    }

    pub fn with_prior(mut self, prior: PriorSequenceIndex) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn force_include_unchanged(mut self, force: bool) -> Self {
        self.force_include_unchanged = force;
        self
    }
}

/// A file physically present in the sequence directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopiedFile {
    pub document_id: DocumentId,
    pub href: String,
    pub checksum: ContentDigest,
    pub module_code: String,
    /// Whether the file has an index leaf.
    pub indexed: bool,
}

/// Outcome of a successful build.
///
/// The serialized form (without the rendered manifests, which are on disk)
/// is the build record kept next to the sequence directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceBuildResult {
    pub key: SequenceKey,
    pub region: RegionCode,
    pub sequence_dir: PathBuf,
    pub index_path: PathBuf,
    pub checksum_path: PathBuf,
    /// Index leaves in emitted order.
    pub entries: Vec<IndexEntry>,
    /// Copied files in path order.
    pub files: Vec<CopiedFile>,
    /// Input documents in assembly order, with digests attached.
    pub documents: Vec<Document>,
    pub built_at: Timestamp,
    #[serde(skip)]
    pub index_xml: String,
    #[serde(skip)]
    pub checksum_manifest: String,
}

impl SequenceBuildResult {
    /// Module codes present in the sequence: every document's exact code
    /// plus its top-level module (`m2.5` contributes `m2.5` and `m2`).
    pub fn module_codes(&self) -> BTreeSet<String> {
        module_set(&self.documents)
    }

    /// Write the build record as JSON.
    pub fn save_record(&self, path: &Path) -> Result<(), EctdError> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| EctdError::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a build record written by [`save_record`](Self::save_record).
    pub fn load_record(path: &Path) -> Result<Self, EctdError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EctdError::NotFound(format!(
                    "build record {}",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| {
            EctdError::Serialization(format!("build record {}: {e}", path.display()))
        })
    }

    /// Leaves that reference a file of this sequence (everything but deletes).
    pub fn included_entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries
            .iter()
            .filter(|e| e.operation != Operation::Delete)
    }
}

/// Module codes exposed by `documents`: each exact code plus its top-level
/// module.
pub fn module_set<'a, I>(documents: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut codes = BTreeSet::new();
    for document in documents {
        let code = document.module_code.as_str();
        codes.insert(code.to_string());
        if let Some((top, _)) = code.split_once('.') {
            codes.insert(top.to_string());
        }
    }
    codes
}

/// A document after staging.
struct Staged<'a> {
    document: &'a Document,
    target: ResolvedPath,
    checksum: ContentDigest,
}

/// Builds sequences under a base directory.
#[derive(Debug, Clone)]
pub struct SequenceAssembler {
    base_dir: PathBuf,
    registry: Arc<ProfileRegistry>,
    locks: SubmissionLocks,
}

impl SequenceAssembler {
    pub fn new(base_dir: impl Into<PathBuf>, registry: Arc<ProfileRegistry>) -> Self {
        Self {
            base_dir: base_dir.into(),
            registry,
            locks: SubmissionLocks::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Directory of one sequence, whether or not it exists yet.
    pub fn sequence_dir(&self, submission: &SubmissionId, number: SequenceNumber) -> PathBuf {
        self.base_dir
            .join(submission.as_str())
            .join(number.as_padded())
    }

    /// `<base>/<submission>/<sequence>.build.json`.
    pub fn record_path(&self, submission: &SubmissionId, number: SequenceNumber) -> PathBuf {
        self.base_dir
            .join(submission.as_str())
            .join(format!("{}{BUILD_RECORD_SUFFIX}", number.as_padded()))
    }

    /// Existing sequence numbers of a submission, ascending. Staging
    /// directories and anything that is not a four-digit name are ignored.
    pub fn existing_sequences(
        &self,
        submission: &SubmissionId,
    ) -> Result<Vec<SequenceNumber>, EctdError> {
        let dir = self.base_dir.join(submission.as_str());
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut numbers = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(number) = entry
                .file_name()
                .to_str()
                .and_then(|n| SequenceNumber::parse(n).ok())
            {
                numbers.push(number);
            }
        }
        numbers.sort();
        Ok(numbers)
    }

    /// Snapshot of the highest existing sequence below `number`, with
    /// titles of indexed paths resolved through the earlier sequences.
    pub fn prior_for(
        &self,
        submission: &SubmissionId,
        number: SequenceNumber,
    ) -> Result<Option<PriorSequenceIndex>, EctdError> {
        let dirs: Vec<PathBuf> = self
            .existing_sequences(submission)?
            .into_iter()
            .rev()
            .filter(|n| *n < number)
            .map(|n| self.sequence_dir(submission, n))
            .collect();
        PriorSequenceIndex::load_chain(&dirs)
    }

    /// Build one sequence.
    pub fn build(&self, request: BuildRequest) -> Result<SequenceBuildResult, EctdError> {
        let BuildRequest {
            submission_id,
            sequence_number,
            region,
            documents,
            prior,
            force_include_unchanged,
        } = request;
        let key = SequenceKey::new(submission_id, sequence_number);
        let span = tracing::info_span!("build_sequence", sequence = %key, region = %region);
        let _entered = span.enter();

        let profile = self.registry.profile_for(region)?;
        let submission_dir = self.base_dir.join(key.submission_id.as_str());
        let sequence_dir = submission_dir.join(sequence_number.as_padded());

        let lock = self.locks.lock_for(&key.submission_id);
        let _guard = lock.lock();

        if sequence_dir.exists() {
            return Err(EctdError::Conflict(format!(
                "sequence {key} already exists at {}",
                sequence_dir.display()
            )));
        }

        validate_request(&key, &documents, prior.as_ref())?;
        let targets = resolve_targets(profile, &documents)?;

        std::fs::create_dir_all(&submission_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&submission_dir)?;

        let mut staged = stage_documents(staging.path(), &documents, targets)?;
        staged.sort_by(|a, b| {
            (&a.document.module_code, &a.document.title, &a.target.href, &a.document.id).cmp(&(
                &b.document.module_code,
                &b.document.title,
                &b.target.href,
                &b.document.id,
            ))
        });

        let entries = plan_entries(profile, &staged, prior.as_ref(), force_include_unchanged);
        let files: Vec<CopiedFile> = {
            let mut files: Vec<CopiedFile> = staged
                .iter()
                .map(|s| CopiedFile {
                    document_id: s.document.id.clone(),
                    href: s.target.href.clone(),
                    checksum: s.checksum,
                    module_code: s.document.module_code.clone(),
                    indexed: s.target.indexed,
                })
                .collect();
            files.sort_by(|a, b| a.href.cmp(&b.href));
            files
        };

        let index_xml = render_index(&entries);
        let checksum_manifest =
            render_checksum_manifest(files.iter().map(|f| (f.href.as_str(), &f.checksum)));
        std::fs::write(staging.path().join(INDEX_FILE), &index_xml)?;
        std::fs::write(staging.path().join(CHECKSUM_FILE), &checksum_manifest)?;

        if let Err(e) = std::fs::rename(staging.path(), &sequence_dir) {
            if sequence_dir.exists() {
                return Err(EctdError::Conflict(format!(
                    "sequence {key} appeared at {} during the build",
                    sequence_dir.display()
                )));
            }
            return Err(e.into());
        }
        // The staging path no longer exists; dropping the handle is a no-op.
        drop(staging);

        let documents: Vec<Document> = staged
            .iter()
            .map(|s| s.document.clone().with_digest(s.checksum))
            .collect();

        tracing::info!(
            dir = %sequence_dir.display(),
            files = files.len(),
            leaves = entries.len(),
            deletes = entries.iter().filter(|e| e.operation == Operation::Delete).count(),
            "sequence built"
        );

        Ok(SequenceBuildResult {
            index_path: sequence_dir.join(INDEX_FILE),
            checksum_path: sequence_dir.join(CHECKSUM_FILE),
            sequence_dir,
            key,
            region,
            entries,
            files,
            documents,
            built_at: Timestamp::now(),
            index_xml,
            checksum_manifest,
        })
    }
}

fn validate_request(
    key: &SequenceKey,
    documents: &[Document],
    prior: Option<&PriorSequenceIndex>,
) -> Result<(), EctdError> {
    if documents.is_empty() {
        return Err(EctdError::Validation(format!(
            "sequence {key} has no documents"
        )));
    }
    if let Some(prior_number) = prior.and_then(PriorSequenceIndex::sequence_number) {
        if prior_number >= key.sequence_number {
            return Err(EctdError::Validation(format!(
                "prior sequence {prior_number} is not older than {}",
                key.sequence_number
            )));
        }
    }
    Ok(())
}

/// Target paths in input order. Two documents may not share a path.
fn resolve_targets(
    profile: &SubmissionProfile,
    documents: &[Document],
) -> Result<Vec<ResolvedPath>, EctdError> {
    let mut seen: HashMap<&str, &DocumentId> = HashMap::new();
    let targets = documents
        .iter()
        .map(|d| profile.resolve(d))
        .collect::<Result<Vec<_>, _>>()?;
    for (document, target) in documents.iter().zip(&targets) {
        if let Some(other) = seen.insert(target.href.as_str(), &document.id) {
            return Err(EctdError::Validation(format!(
                "documents {other} and {} both resolve to {}",
                document.id, target.href
            )));
        }
    }
    Ok(targets)
}

fn stage_documents<'a>(
    staging_root: &Path,
    documents: &'a [Document],
    targets: Vec<ResolvedPath>,
) -> Result<Vec<Staged<'a>>, EctdError> {
    let outcomes: Vec<Result<ContentDigest, DocumentFailure>> = documents
        .par_iter()
        .zip(targets.par_iter())
        .map(|(document, target)| stage_document(staging_root, document, &target.href))
        .collect();

    let mut staged = Vec::with_capacity(documents.len());
    let mut failures = Vec::new();
    for ((document, target), outcome) in documents.iter().zip(targets).zip(outcomes) {
        match outcome {
            Ok(checksum) => staged.push(Staged {
                document,
                target,
                checksum,
            }),
            Err(failure) => failures.push(failure),
        }
    }

    if !failures.is_empty() {
        for failure in &failures {
            tracing::warn!(
                document = %failure.document_id,
                path = %failure.path.display(),
                reason = %failure.reason,
                "document unreadable"
            );
        }
        return Err(EctdError::IoFailure { failures });
    }
    Ok(staged)
}

/// Copy one document to its staged path and digest the staged bytes.
fn stage_document(
    staging_root: &Path,
    document: &Document,
    href: &str,
) -> Result<ContentDigest, DocumentFailure> {
    let failure = |e: std::io::Error| DocumentFailure {
        document_id: document.id.clone(),
        path: document.file_path.clone(),
        reason: e.to_string(),
    };
    let dest = staging_root.join(href);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(&failure)?;
    }
    std::fs::copy(&document.file_path, &dest).map_err(&failure)?;
    digest_file(&dest).map_err(&failure)
}

/// Index leaves: included documents in assembly order, then deletes in
/// path order.
fn plan_entries(
    profile: &SubmissionProfile,
    staged: &[Staged<'_>],
    prior: Option<&PriorSequenceIndex>,
    force_include_unchanged: bool,
) -> Vec<IndexEntry> {
    let mut entries = Vec::new();
    for s in staged.iter().filter(|s| s.target.indexed) {
        let operation = match prior.and_then(|p| p.get(&s.target.href)) {
            None => Some(Operation::New),
            Some(previous) if previous.checksum != s.checksum => Some(Operation::Replace),
            Some(_) if force_include_unchanged => Some(Operation::Replace),
            Some(_) => None,
        };
        let Some(operation) = operation else {
            tracing::debug!(href = %s.target.href, "unchanged since prior sequence, omitted");
            continue;
        };
        entries.push(IndexEntry {
            href: s.target.href.clone(),
            operation,
            checksum: s.checksum,
            title: s.document.title.clone(),
            document_id: Some(s.document.id.clone()),
            module_code: Some(s.document.module_code.clone()),
        });
    }

    if let Some(prior) = prior {
        let current: HashSet<&str> = staged.iter().map(|s| s.target.href.as_str()).collect();
        for (href, previous) in prior.iter() {
            if current.contains(href) || !profile.tracks_lifecycle(href) {
                continue;
            }
            // Only paths that had a leaf can be deleted from the lifecycle.
            let Some(title) = previous.title.as_ref() else {
                continue;
            };
            entries.push(IndexEntry {
                href: href.to_string(),
                operation: Operation::Delete,
                checksum: previous.checksum,
                title: title.clone(),
                document_id: None,
                module_code: None,
            });
        }
    }
    entries
}
