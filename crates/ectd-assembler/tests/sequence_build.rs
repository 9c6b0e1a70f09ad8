//! End-to-end sequence builds against a temporary base directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ectd_assembler::{
    check_sequence, verify_sequence, BuildRequest, Operation, PriorSequenceIndex,
    SequenceAssembler, SequenceBuildResult,
};
use ectd_core::{
    digest, Document, DocumentId, DocumentStatus, ErrorKind, RegionCode, SequenceNumber,
    SubmissionId,
};
use ectd_profile::ProfileRegistry;
use proptest::prelude::*;

const SAMPLE_MD5: &str = "5e8ff9bf55ba3508199d22e984129be6";

struct Workspace {
    _root: tempfile::TempDir,
    sources: PathBuf,
    assembler: SequenceAssembler,
}

impl Workspace {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let sources = root.path().join("sources");
        std::fs::create_dir_all(&sources).unwrap();
        let assembler = SequenceAssembler::new(
            root.path().join("sequences"),
            Arc::new(ProfileRegistry::builtin()),
        );
        Self {
            _root: root,
            sources,
            assembler,
        }
    }

    fn source(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.sources.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn build(&self, seq: u16, documents: Vec<Document>) -> Result<SequenceBuildResult, ectd_core::EctdError> {
        let request = BuildRequest::new(pid(), number(seq), RegionCode::Fda, documents);
        let request = match self.assembler.prior_for(&pid(), number(seq)).unwrap() {
            Some(prior) => request.with_prior(prior),
            None => request,
        };
        self.assembler.build(request)
    }
}

fn pid() -> SubmissionId {
    SubmissionId::new("PID").unwrap()
}

fn number(n: u16) -> SequenceNumber {
    SequenceNumber::new(n).unwrap()
}

fn doc(id: &str, title: &str, module: &str, path: &Path, doc_type: Option<&str>) -> Document {
    let d = Document::new(DocumentId::new(id).unwrap(), title, module, path)
        .with_status(DocumentStatus::Approved);
    match doc_type {
        Some(t) => d.with_document_type(t),
        None => d,
    }
}

fn staging_leftovers(submission_dir: &Path) -> Vec<String> {
    match std::fs::read_dir(submission_dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(".staging-"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[test]
fn form_1571_1572_fixture() {
    let ws = Workspace::new();
    let f1571 = ws.source("1571.docx", b"sample");
    let f1572 = ws.source("1572.docx", b"sample");

    let result = ws
        .build(
            1,
            vec![
                doc("doc-1571", "Form 1571", "m1", &f1571, None),
                doc("doc-1572", "Form 1572", "m1", &f1572, Some("form-1572")),
            ],
        )
        .unwrap();

    let expected_index = format!(
        "<?xml version='1.0' encoding='utf-8'?>\n<ectd><leaf href=\"m1/1572.docx\" operation=\"new\" checksum=\"{SAMPLE_MD5}\" checksumType=\"md5\"><title>Form 1572</title></leaf></ectd>"
    );
    let expected_checksums =
        format!("{SAMPLE_MD5}  m1/1571.docx\n{SAMPLE_MD5}  m1/1572.docx\n");

    assert_eq!(result.index_xml, expected_index);
    assert_eq!(result.checksum_manifest, expected_checksums);

    let dir = ws.assembler.sequence_dir(&pid(), number(1));
    assert_eq!(result.sequence_dir, dir);
    assert!(dir.ends_with("PID/0001"));
    assert_eq!(std::fs::read_to_string(dir.join("index.xml")).unwrap(), expected_index);
    assert_eq!(
        std::fs::read_to_string(dir.join("checksum.md5")).unwrap(),
        expected_checksums
    );
    assert_eq!(std::fs::read(dir.join("m1/1571.docx")).unwrap(), b"sample");
    assert_eq!(std::fs::read(dir.join("m1/1572.docx")).unwrap(), b"sample");

    assert_eq!(result.files.len(), 2);
    assert!(result.documents.iter().all(|d| d.digest == Some(digest(b"sample"))));
    assert!(staging_leftovers(&ws.assembler.base_dir().join("PID")).is_empty());
}

#[test]
fn existing_sequence_is_never_overwritten() {
    let ws = Workspace::new();
    let a = ws.source("cover.pdf", b"first");
    ws.build(1, vec![doc("a", "Cover", "m1", &a, Some("cover-letter"))])
        .unwrap();

    let b = ws.source("other.pdf", b"second");
    let request = BuildRequest::new(
        pid(),
        number(1),
        RegionCode::Fda,
        vec![doc("b", "Other", "m1", &b, Some("cover-letter"))],
    );
    let err = ws.assembler.build(request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let dir = ws.assembler.sequence_dir(&pid(), number(1));
    assert_eq!(std::fs::read(dir.join("m1/cover.pdf")).unwrap(), b"first");
    assert!(!dir.join("m1/other.pdf").exists());
}

#[test]
fn concurrent_builds_of_one_sequence_yield_one_winner() {
    let ws = Workspace::new();
    let a = ws.source("cover.pdf", b"x");
    let documents = vec![doc("a", "Cover", "m1", &a, Some("cover-letter"))];

    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let assembler = ws.assembler.clone();
                let documents = documents.clone();
                scope.spawn(move || {
                    assembler.build(BuildRequest::new(pid(), number(1), RegionCode::Fda, documents))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    for outcome in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        assert_eq!(outcome.kind(), ErrorKind::Conflict);
    }
}

#[test]
fn delta_against_prior_sequence() {
    let ws = Workspace::new();
    let cover = ws.source("cover.pdf", b"cover v1");
    let overview = ws.source("overview.pdf", b"overview v1");
    let csr = ws.source("csr.pdf", b"csr v1");

    let first = ws
        .build(
            1,
            vec![
                doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter")),
                doc("overview", "Clinical Overview", "m2.5", &overview, Some("clinical-overview")),
                doc("csr", "Study 001", "m5.3", &csr, Some("clinical-study-report")),
            ],
        )
        .unwrap();
    assert!(first.entries.iter().all(|e| e.operation == Operation::New));
    assert_eq!(first.entries.len(), 3);

    let overview_v2 = ws.source("overview.pdf", b"overview v2");
    let drug = ws.source("drug.pdf", b"drug substance");
    let second = ws
        .build(
            2,
            vec![
                doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter")),
                doc("overview", "Clinical Overview", "m2.5", &overview_v2, Some("clinical-overview")),
                doc("drug", "Drug Substance", "m3.2", &drug, Some("drug-substance")),
            ],
        )
        .unwrap();

    let summary: Vec<(&str, Operation)> = second
        .entries
        .iter()
        .map(|e| (e.href.as_str(), e.operation))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("m2/25-clin-over/overview.pdf", Operation::Replace),
            ("m3/32-body-data/32s-drug-sub/drug.pdf", Operation::New),
            ("m5/53-clin-stud-rep/csr.pdf", Operation::Delete),
        ]
    );

    let deleted = &second.entries[2];
    assert_eq!(deleted.title, "Study 001");
    assert_eq!(deleted.checksum, digest(b"csr v1"));
    assert_eq!(second.entries[0].checksum, digest(b"overview v2"));

    // Unchanged documents are still physically present.
    assert!(second.sequence_dir.join("m1/cover.pdf").exists());
    assert!(second.checksum_manifest.contains("m1/cover.pdf"));
    assert!(!second.sequence_dir.join("m5/53-clin-stud-rep/csr.pdf").exists());
}

#[test]
fn withdrawal_after_unchanged_sequence_emits_delete() {
    let ws = Workspace::new();
    let cover = ws.source("cover.pdf", b"cover");
    let csr = ws.source("csr.pdf", b"csr v1");
    let documents = vec![
        doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter")),
        doc("csr", "Study 001", "m5.3", &csr, Some("clinical-study-report")),
    ];
    ws.build(1, documents.clone()).unwrap();
    // Nothing changed: 0002 has no leaves, so its index knows no titles.
    let second = ws.build(2, documents).unwrap();
    assert!(second.entries.is_empty());

    let third = ws
        .build(3, vec![doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter"))])
        .unwrap();
    let summary: Vec<(&str, Operation, &str)> = third
        .entries
        .iter()
        .map(|e| (e.href.as_str(), e.operation, e.title.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![("m5/53-clin-stud-rep/csr.pdf", Operation::Delete, "Study 001")]
    );
    assert_eq!(third.entries[0].checksum, digest(b"csr v1"));

    // The same chain built in-process from build results.
    let from_result = PriorSequenceIndex::from_build(&second);
    assert_eq!(
        from_result.get("m5/53-clin-stud-rep/csr.pdf").unwrap().title.as_deref(),
        Some("Study 001")
    );
}

#[test]
fn deleted_path_does_not_regain_an_older_title() {
    let ws = Workspace::new();
    let cover = ws.source("cover.pdf", b"cover");
    let memo = ws.source("memo.pdf", b"memo");

    ws.build(
        1,
        vec![
            doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter")),
            doc("memo", "Memo", "m1", &memo, Some("form-356h")),
        ],
    )
    .unwrap();
    let second = ws
        .build(2, vec![doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter"))])
        .unwrap();
    assert_eq!(second.entries[0].operation, Operation::Delete);

    // Back at the same path, now as an unindexed supporting file.
    let third = ws
        .build(
            3,
            vec![
                doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter")),
                doc("memo", "Memo", "m1", &memo, None),
            ],
        )
        .unwrap();
    assert!(third.entries.is_empty());

    let fourth = ws
        .build(4, vec![doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter"))])
        .unwrap();
    assert!(fourth.entries.is_empty());
}

#[test]
fn forced_unchanged_documents_are_replaced() {
    let ws = Workspace::new();
    let cover = ws.source("cover.pdf", b"cover");
    let documents = vec![doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter"))];
    ws.build(1, documents.clone()).unwrap();

    let prior = PriorSequenceIndex::load(&ws.assembler.sequence_dir(&pid(), number(1))).unwrap();
    assert_eq!(prior.sequence_number(), Some(number(1)));

    let result = ws
        .assembler
        .build(
            BuildRequest::new(pid(), number(2), RegionCode::Fda, documents)
                .with_prior(prior)
                .force_include_unchanged(true),
        )
        .unwrap();
    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].operation, Operation::Replace);
}

#[test]
fn unchanged_only_sequence_has_empty_index() {
    let ws = Workspace::new();
    let cover = ws.source("cover.pdf", b"cover");
    let documents = vec![doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter"))];
    ws.build(1, documents.clone()).unwrap();

    let result = ws.build(2, documents).unwrap();
    assert!(result.entries.is_empty());
    assert_eq!(
        result.index_xml,
        "<?xml version='1.0' encoding='utf-8'?>\n<ectd />"
    );
}

#[test]
fn prior_must_be_older() {
    let ws = Workspace::new();
    let cover = ws.source("cover.pdf", b"cover");
    let documents = vec![doc("cover", "Cover Letter", "m1", &cover, Some("cover-letter"))];
    let first = ws.build(3, documents.clone()).unwrap();

    let err = ws
        .assembler
        .build(
            BuildRequest::new(pid(), number(2), RegionCode::Fda, documents)
                .with_prior(PriorSequenceIndex::from_build(&first)),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn every_unreadable_document_is_reported() {
    let ws = Workspace::new();
    let good = ws.source("good.pdf", b"ok");
    let missing_a = ws.sources.join("missing-a.pdf");
    let missing_b = ws.sources.join("missing-b.pdf");

    let err = ws
        .build(
            1,
            vec![
                doc("missing-a", "A", "m1", &missing_a, Some("cover-letter")),
                doc("good", "Good", "m1", &good, Some("form-356h")),
                doc("missing-b", "B", "m2", &missing_b, None),
            ],
        )
        .unwrap_err();

    match err {
        ectd_core::EctdError::IoFailure { failures } => {
            let ids: Vec<&str> = failures.iter().map(|f| f.document_id.as_str()).collect();
            assert_eq!(ids, vec!["missing-a", "missing-b"]);
            assert_eq!(failures[0].path, missing_a);
        }
        other => panic!("expected IoFailure, got {other:?}"),
    }

    assert!(!ws.assembler.sequence_dir(&pid(), number(1)).exists());
    assert!(staging_leftovers(&ws.assembler.base_dir().join("PID")).is_empty());
}

#[test]
fn input_validation() {
    let ws = Workspace::new();
    let a = ws.source("a.pdf", b"a");
    let other_dir = ws.sources.join("nested");
    std::fs::create_dir_all(&other_dir).unwrap();
    let a_again = other_dir.join("a.pdf");
    std::fs::write(&a_again, b"a2").unwrap();

    let err = ws.build(1, Vec::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = ws
        .build(1, vec![doc("x", "X", "m9", &a, None)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = ws
        .build(
            1,
            vec![
                doc("one", "One", "m1", &a, Some("cover-letter")),
                doc("two", "Two", "m1", &a_again, None),
            ],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("m1/a.pdf"));

    assert!(!ws.assembler.sequence_dir(&pid(), number(1)).exists());
}

#[test]
fn unconfigured_region_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    let hc_only: Vec<_> = ectd_profile::builtin_profiles()
        .into_iter()
        .filter(|p| p.region == RegionCode::Hc)
        .collect();
    let assembler =
        SequenceAssembler::new(root.path(), Arc::new(ProfileRegistry::new(hc_only).unwrap()));
    let file = root.path().join("a.pdf");
    std::fs::write(&file, b"a").unwrap();

    let err = assembler
        .build(BuildRequest::new(
            pid(),
            number(1),
            RegionCode::Fda,
            vec![doc("a", "A", "m1", &file, None)],
        ))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn verification_detects_tampering() {
    let ws = Workspace::new();
    let a = ws.source("a.pdf", b"alpha");
    let b = ws.source("b.pdf", b"beta");
    let result = ws
        .build(
            1,
            vec![
                doc("a", "A", "m1", &a, Some("cover-letter")),
                doc("b", "B", "m2", &b, None),
            ],
        )
        .unwrap();

    let clean = verify_sequence(&result.sequence_dir).unwrap();
    assert!(clean.is_clean());
    assert_eq!(clean.checked, 2);

    std::fs::write(result.sequence_dir.join("m1/a.pdf"), b"tampered").unwrap();
    std::fs::remove_file(result.sequence_dir.join("m2/b.pdf")).unwrap();
    std::fs::write(result.sequence_dir.join("m1/extra.pdf"), b"?").unwrap();

    let report = verify_sequence(&result.sequence_dir).unwrap();
    assert!(!report.is_clean());
    assert_eq!(report.mismatched.len(), 1);
    assert_eq!(report.mismatched[0].href, "m1/a.pdf");
    assert_eq!(report.mismatched[0].expected, digest(b"alpha"));
    assert_eq!(report.mismatched[0].actual, digest(b"tampered"));
    assert_eq!(report.missing, vec!["m2/b.pdf"]);
    assert_eq!(report.unlisted, vec!["m1/extra.pdf"]);
}

#[test]
fn verification_of_non_sequence_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = verify_sequence(dir.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn module_set_feeds_region_rules() {
    let ws = Workspace::new();
    let a = ws.source("a.pdf", b"a");
    let b = ws.source("b.pdf", b"b");
    let result = ws
        .build(
            1,
            vec![
                doc("a", "A", "m1", &a, Some("cover-letter")),
                doc("b", "B", "m2.5", &b, Some("clinical-overview")),
            ],
        )
        .unwrap();

    let codes: Vec<String> = result.module_codes().into_iter().collect();
    assert_eq!(codes, vec!["m1", "m2", "m2.5"]);

    let report = check_sequence(ws.assembler.registry(), &result).unwrap();
    assert_eq!(report.missing, vec!["m3", "m4", "m5"]);
}

fn shuffled_build(order: &[usize]) -> (String, String) {
    let ws = Workspace::new();
    let specs = [
        ("cover", "Cover Letter", "m1", Some("cover-letter"), &b"c"[..]),
        ("form", "Form 356h", "m1", Some("form-356h"), &b"f"[..]),
        ("support", "Support", "m1", None, &b"s"[..]),
        ("overview", "Clinical Overview", "m2.5", Some("clinical-overview"), &b"o"[..]),
        ("csr", "Study 001", "m5.3", Some("clinical-study-report"), &b"r"[..]),
    ];
    let documents = order
        .iter()
        .map(|&i| {
            let (id, title, module, doc_type, bytes) = specs[i];
            let path = ws.source(&format!("{id}.pdf"), bytes);
            doc(id, title, module, &path, doc_type)
        })
        .collect();
    let result = ws.build(1, documents).unwrap();
    (result.index_xml, result.checksum_manifest)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn input_order_does_not_change_manifests(order in Just(vec![0usize, 1, 2, 3, 4]).prop_shuffle()) {
        let baseline = shuffled_build(&[0, 1, 2, 3, 4]);
        let shuffled = shuffled_build(&order);
        prop_assert_eq!(baseline, shuffled);
    }
}

#[test]
fn build_record_round_trip() {
    let ws = Workspace::new();
    let a = ws.source("a.pdf", b"a");
    let result = ws
        .build(1, vec![doc("a", "A", "m2.5", &a, Some("clinical-overview"))])
        .unwrap();

    let record = ws.assembler.record_path(&pid(), number(1));
    assert!(record.ends_with("PID/0001.build.json"));
    result.save_record(&record).unwrap();

    let loaded = SequenceBuildResult::load_record(&record).unwrap();
    assert_eq!(loaded.key, result.key);
    assert_eq!(loaded.entries, result.entries);
    assert_eq!(loaded.files, result.files);
    assert_eq!(loaded.module_codes(), result.module_codes());
    assert_eq!(loaded.built_at, result.built_at);

    // Records sit beside sequence directories without being mistaken for one.
    assert_eq!(ws.assembler.existing_sequences(&pid()).unwrap(), vec![number(1)]);
}
