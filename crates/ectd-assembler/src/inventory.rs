//! # Document Inventory Collector
//!
//! The document store is owned by an external approval workflow. The
//! assembler only sees it through [`DocumentStore`], and only through
//! [`collect`], which narrows it to the documents eligible for a sequence.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use ectd_core::{Document, DocumentStatus, EctdError};

/// Read-only access to candidate documents.
pub trait DocumentStore {
    fn list_documents(&self) -> Result<Vec<Document>, EctdError>;
}

/// Which documents to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryFilter {
    /// Required status. `None` accepts every status.
    pub status: Option<DocumentStatus>,
    /// Module prefix (`m2` matches `m2` and `m2.5`, not `m20`).
    pub module_prefix: Option<String>,
}

impl Default for InventoryFilter {
    fn default() -> Self {
        Self {
            status: Some(DocumentStatus::Approved),
            module_prefix: None,
        }
    }
}

impl InventoryFilter {
    /// Approved documents in every module.
    pub fn approved() -> Self {
        Self::default()
    }

    /// Documents in any status.
    pub fn any_status() -> Self {
        Self {
            status: None,
            module_prefix: None,
        }
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_module_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.module_prefix = Some(prefix.into());
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        let status_ok = self.status.map_or(true, |s| document.status == s);
        let module_ok = self
            .module_prefix
            .as_deref()
            .map_or(true, |prefix| document.in_module(prefix));
        status_ok && module_ok
    }
}

/// Documents in `store` that pass `filter`, in store order.
pub fn collect<S>(store: &S, filter: &InventoryFilter) -> Result<Vec<Document>, EctdError>
where
    S: DocumentStore + ?Sized,
{
    let all = store.list_documents()?;
    let total = all.len();
    let selected: Vec<Document> = all.into_iter().filter(|d| filter.matches(d)).collect();
    tracing::debug!(
        total,
        selected = selected.len(),
        status = ?filter.status,
        module_prefix = ?filter.module_prefix,
        "collected document inventory"
    );
    Ok(selected)
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Vec<Document>,
}

impl MemoryStore {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn push(&mut self, document: Document) {
        self.documents.push(document);
    }
}

impl DocumentStore for MemoryStore {
    fn list_documents(&self) -> Result<Vec<Document>, EctdError> {
        Ok(self.documents.clone())
    }
}

#[derive(Deserialize)]
struct InventoryFile {
    documents: Vec<Document>,
}

/// Inventory read from a YAML (or JSON) file of the form
/// `documents: [ { id, title, module_code, file_path, status, ... } ]`.
///
/// Relative `file_path` values are resolved against the inventory file's
/// directory.
#[derive(Debug, Clone)]
pub struct InventoryFileStore {
    path: PathBuf,
}

impl InventoryFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for InventoryFileStore {
    fn list_documents(&self) -> Result<Vec<Document>, EctdError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EctdError::NotFound(format!(
                    "inventory file {}",
                    self.path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let file: InventoryFile = serde_yaml::from_str(&text).map_err(|e| {
            EctdError::Validation(format!("inventory {}: {e}", self.path.display()))
        })?;

        let base = self.path.parent().unwrap_or_else(|| Path::new("."));
        Ok(file
            .documents
            .into_iter()
            .map(|mut d| {
                if d.file_path.is_relative() {
                    d.file_path = base.join(&d.file_path);
                }
                d
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ectd_core::DocumentId;

    fn doc(id: &str, module: &str, status: DocumentStatus) -> Document {
        Document::new(DocumentId::new(id).unwrap(), id, module, format!("/s/{id}.pdf"))
            .with_status(status)
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            doc("a", "m1", DocumentStatus::Approved),
            doc("b", "m2", DocumentStatus::Approved),
            doc("c", "m2.5", DocumentStatus::Approved),
            doc("d", "m20", DocumentStatus::Approved),
            doc("e", "m2.5", DocumentStatus::Pending),
            doc("f", "m3", DocumentStatus::QcFailed),
        ])
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn default_filter_selects_approved() {
        let docs = collect(&store(), &InventoryFilter::default()).unwrap();
        assert_eq!(ids(&docs), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn module_prefix_respects_section_boundaries() {
        let filter = InventoryFilter::approved().with_module_prefix("m2");
        let docs = collect(&store(), &filter).unwrap();
        assert_eq!(ids(&docs), vec!["b", "c"]);
    }

    #[test]
    fn any_status_and_explicit_status() {
        let docs = collect(&store(), &InventoryFilter::any_status()).unwrap();
        assert_eq!(docs.len(), 6);

        let filter = InventoryFilter::any_status().with_status(DocumentStatus::QcFailed);
        assert_eq!(ids(&collect(&store(), &filter).unwrap()), vec!["f"]);
    }

    #[test]
    fn store_errors_propagate() {
        struct Broken;
        impl DocumentStore for Broken {
            fn list_documents(&self) -> Result<Vec<Document>, EctdError> {
                Err(EctdError::NotFound("store offline".into()))
            }
        }
        let err = collect(&Broken, &InventoryFilter::default()).unwrap_err();
        assert_eq!(err.kind(), ectd_core::ErrorKind::NotFound);
    }

    #[test]
    fn file_store_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.yaml");
        std::fs::write(
            &path,
            r#"
documents:
  - id: doc-1572
    title: Form 1572
    module_code: m1
    file_path: files/1572.docx
    document_type: form-1572
    status: approved
  - id: doc-abs
    title: Absolute
    module_code: m1
    file_path: /abs/x.pdf
    status: pending
"#,
        )
        .unwrap();

        let docs = InventoryFileStore::new(&path).list_documents().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].file_path, dir.path().join("files/1572.docx"));
        assert_eq!(docs[0].document_type.as_deref(), Some("form-1572"));
        assert_eq!(docs[1].file_path, PathBuf::from("/abs/x.pdf"));
    }

    #[test]
    fn file_store_missing_file() {
        let err = InventoryFileStore::new("/nonexistent/inventory.yaml")
            .list_documents()
            .unwrap_err();
        assert_eq!(err.kind(), ectd_core::ErrorKind::NotFound);
    }
}
