//! # Index and Checksum Manifests
//!
//! Both manifests are byte-deterministic functions of their inputs.
//!
//! ## Index
//!
//! ```text
//! <?xml version='1.0' encoding='utf-8'?>
//! <ectd><leaf href="m1/1572.docx" operation="new" checksum="…" checksumType="md5"><title>Form 1572</title></leaf></ectd>
//! ```
//!
//! Leaf attribute order is `href`, `operation`, `checksum`, `checksumType`.
//! The `ectd` root with no leaves is written as `<ectd />`.
//!
//! ## Checksum Manifest
//!
//! One line per copied file, `<md5>` two spaces `<relative path>` and a
//! newline, sorted by relative path.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use ectd_core::{ContentDigest, DocumentId, EctdError, XmlDocument, XmlElement, CHECKSUM_TYPE};

/// Root element of the index manifest.
pub const INDEX_ROOT: &str = "ectd";

/// Lifecycle operation of an index leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// The path did not exist in the prior sequence.
    New,
    /// The path existed with a different (or forced) content.
    Replace,
    /// The path existed in the prior sequence and is gone now.
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Replace => "replace",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = EctdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "replace" => Ok(Self::Replace),
            "delete" => Ok(Self::Delete),
            other => Err(EctdError::Xml(format!("unknown leaf operation {other:?}"))),
        }
    }
}

/// One `leaf` of the index manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Relative path inside the sequence directory.
    pub href: String,
    pub operation: Operation,
    pub checksum: ContentDigest,
    pub title: String,
    /// Source document. `None` for delete leaves and for entries read back
    /// from disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    /// Module code of the source document, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_code: Option<String>,
}

impl IndexEntry {
    fn to_element(&self) -> XmlElement {
        XmlElement::new("leaf")
            .attr("href", self.href.as_str())
            .attr("operation", self.operation.as_str())
            .attr("checksum", self.checksum.to_hex())
            .attr("checksumType", CHECKSUM_TYPE)
            .child(XmlElement::text_element("title", self.title.as_str()))
    }
}

/// Render the index manifest for `entries`, in the given order.
pub fn render_index(entries: &[IndexEntry]) -> String {
    let root = entries
        .iter()
        .fold(XmlElement::new(INDEX_ROOT), |root, entry| {
            root.child(entry.to_element())
        });
    XmlDocument::new(root).to_xml_string()
}

/// Render the checksum manifest. Lines are sorted by path regardless of the
/// input order.
pub fn render_checksum_manifest<'a, I>(files: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a ContentDigest)>,
{
    let sorted: BTreeMap<&str, &ContentDigest> = files.into_iter().collect();
    let mut out = String::new();
    for (path, checksum) in sorted {
        out.push_str(&checksum.to_hex());
        out.push_str("  ");
        out.push_str(path);
        out.push('\n');
    }
    out
}

/// Parse a checksum manifest into `(path, digest)` pairs in file order.
pub fn parse_checksum_manifest(text: &str) -> Result<Vec<(String, ContentDigest)>, EctdError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            let (hex, path) = line.split_once("  ").ok_or_else(|| {
                EctdError::Validation(format!("checksum manifest line {}: missing separator", n + 1))
            })?;
            let digest = ContentDigest::from_hex(hex.trim()).map_err(|e| {
                EctdError::Validation(format!("checksum manifest line {}: {e}", n + 1))
            })?;
            if path.is_empty() {
                return Err(EctdError::Validation(format!(
                    "checksum manifest line {}: empty path",
                    n + 1
                )));
            }
            Ok((path.to_string(), digest))
        })
        .collect()
}

#[derive(Default)]
struct LeafBuilder {
    href: Option<String>,
    operation: Option<String>,
    checksum: Option<String>,
    title: String,
}

impl LeafBuilder {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, EctdError> {
        let mut leaf = Self::default();
        for attr in start.attributes() {
            let attr = attr.map_err(xml_error)?;
            let value = attr.unescape_value().map_err(xml_error)?.into_owned();
            match attr.key.as_ref() {
                b"href" => leaf.href = Some(value),
                b"operation" => leaf.operation = Some(value),
                b"checksum" => leaf.checksum = Some(value),
                _ => {}
            }
        }
        Ok(leaf)
    }

    fn finish(self) -> Result<IndexEntry, EctdError> {
        let href = self
            .href
            .ok_or_else(|| EctdError::Xml("leaf without href".to_string()))?;
        let operation = self
            .operation
            .ok_or_else(|| EctdError::Xml(format!("leaf {href} without operation")))?
            .parse()?;
        let checksum = self
            .checksum
            .ok_or_else(|| EctdError::Xml(format!("leaf {href} without checksum")))?;
        let checksum = ContentDigest::from_hex(&checksum)
            .map_err(|e| EctdError::Xml(format!("leaf {href}: {e}")))?;
        Ok(IndexEntry {
            href,
            operation,
            checksum,
            title: self.title,
            document_id: None,
            module_code: None,
        })
    }
}

fn xml_error(e: impl std::fmt::Display) -> EctdError {
    EctdError::Xml(e.to_string())
}

/// Parse the leaves of an index manifest, in document order.
pub fn parse_index(xml: &str) -> Result<Vec<IndexEntry>, EctdError> {
    let mut reader = Reader::from_str(xml);
    let mut leaves = Vec::new();
    let mut current: Option<LeafBuilder> = None;
    let mut in_title = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"leaf" => current = Some(LeafBuilder::from_start(&e)?),
                b"title" => in_title = current.is_some(),
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"leaf" => {
                leaves.push(LeafBuilder::from_start(&e)?.finish()?);
            }
            Event::Text(t) if in_title => {
                if let Some(leaf) = current.as_mut() {
                    leaf.title.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(t) if in_title => {
                if let Some(leaf) = current.as_mut() {
                    leaf.title.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"title" => in_title = false,
                b"leaf" => {
                    if let Some(leaf) = current.take() {
                        leaves.push(leaf.finish()?);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ectd_core::digest;

    fn entry(href: &str, op: Operation, title: &str) -> IndexEntry {
        IndexEntry {
            href: href.to_string(),
            operation: op,
            checksum: digest(b"sample"),
            title: title.to_string(),
            document_id: None,
            module_code: None,
        }
    }

    #[test]
    fn index_matches_gateway_format() {
        let xml = render_index(&[entry("m1/1572.docx", Operation::New, "Form 1572")]);
        assert_eq!(
            xml,
            "<?xml version='1.0' encoding='utf-8'?>\n<ectd><leaf href=\"m1/1572.docx\" operation=\"new\" checksum=\"5e8ff9bf55ba3508199d22e984129be6\" checksumType=\"md5\"><title>Form 1572</title></leaf></ectd>"
        );
    }

    #[test]
    fn empty_index_is_self_closing_root() {
        assert_eq!(
            render_index(&[]),
            "<?xml version='1.0' encoding='utf-8'?>\n<ectd />"
        );
    }

    #[test]
    fn checksum_manifest_is_sorted_by_path() {
        let a = digest(b"a");
        let b = digest(b"b");
        let text = render_checksum_manifest([("m2/x.pdf", &b), ("m1/y.pdf", &a)]);
        assert_eq!(
            text,
            format!("{}  m1/y.pdf\n{}  m2/x.pdf\n", a.to_hex(), b.to_hex())
        );
    }

    #[test]
    fn checksum_manifest_parse() {
        let a = digest(b"a");
        let text = format!("{}  m1/a b.pdf\n\n", a.to_hex());
        let parsed = parse_checksum_manifest(&text).unwrap();
        assert_eq!(parsed, vec![("m1/a b.pdf".to_string(), a)]);

        assert!(parse_checksum_manifest("nothex  m1/a.pdf\n").is_err());
        assert!(parse_checksum_manifest("5e8ff9bf55ba3508199d22e984129be6 m1/a.pdf\n").is_err());
    }

    #[test]
    fn index_parse_reads_back_rendered_leaves() {
        let entries = vec![
            entry("m1/a.pdf", Operation::New, "Cover & Letter <draft>"),
            entry("m2/b.pdf", Operation::Delete, "Old \"overview\""),
        ];
        let parsed = parse_index(&render_index(&entries)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn index_parse_rejects_unknown_operation() {
        let xml = "<ectd><leaf href=\"a\" operation=\"append\" checksum=\"5e8ff9bf55ba3508199d22e984129be6\" checksumType=\"md5\"><title>x</title></leaf></ectd>";
        let err = parse_index(xml).unwrap_err();
        assert_eq!(err.kind(), ectd_core::ErrorKind::Internal);
    }
}
