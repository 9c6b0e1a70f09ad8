//! # Regional Envelope
//!
//! Each authority expects submission metadata alongside the index: who is
//! submitting, under which application/procedure, and what the sequence
//! contains. [`build_envelope`] derives that from a built sequence and the
//! region's profile; [`Envelope::to_xml`] serializes it under the profile's
//! regional root element.

use serde::{Deserialize, Serialize};

use ectd_core::{
    ContentDigest, EctdError, RegionCode, SequenceNumber, SubmissionId, Timestamp,
    XmlDocument, XmlElement, CHECKSUM_TYPE,
};
use ectd_profile::SubmissionProfile;

use crate::assembler::SequenceBuildResult;
use crate::manifest::Operation;

/// Application/procedure the sequence belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureMeta {
    /// e.g. an NDA/IND number or an EU procedure number.
    pub application_number: String,
    /// e.g. `nda`, `ind`, `maa`.
    pub application_type: String,
    /// e.g. `original-application`, `amendment`.
    pub submission_type: String,
    /// e.g. `centralised` for EMA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
}

/// Applicant metadata supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    pub procedure: ProcedureMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    pub region: RegionCode,
    pub dtd_version: String,
    pub submission_id: SubmissionId,
    pub sequence_number: SequenceNumber,
    pub built_at: Timestamp,
    pub applicant: ApplicantMeta,
}

/// One indexed document of the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub href: String,
    pub title: String,
    pub operation: Operation,
    pub checksum: ContentDigest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_code: Option<String>,
}

/// Regional envelope of one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Root element name, from the profile.
    pub root: String,
    pub header: EnvelopeHeader,
    pub inventory: Vec<InventoryItem>,
}

/// Build the envelope for `sequence` under `profile`.
pub fn build_envelope(
    sequence: &SequenceBuildResult,
    profile: &SubmissionProfile,
    applicant: &ApplicantMeta,
) -> Result<Envelope, EctdError> {
    if profile.region != sequence.region {
        return Err(EctdError::Validation(format!(
            "sequence {} was built for {}, not {}",
            sequence.key, sequence.region, profile.region
        )));
    }
    if sequence.included_entries().next().is_none() {
        return Err(EctdError::Validation(format!(
            "sequence {} has no indexed documents",
            sequence.key
        )));
    }

    let inventory: Vec<InventoryItem> = sequence
        .included_entries()
        .map(|e| InventoryItem {
            href: e.href.clone(),
            title: e.title.clone(),
            operation: e.operation,
            checksum: e.checksum,
            module_code: e.module_code.clone(),
        })
        .collect();

    Ok(Envelope {
        root: profile.envelope_root.clone(),
        header: EnvelopeHeader {
            region: profile.region,
            dtd_version: profile.dtd_version.clone(),
            submission_id: sequence.key.submission_id.clone(),
            sequence_number: sequence.key.sequence_number,
            built_at: sequence.built_at,
            applicant: applicant.clone(),
        },
        inventory,
    })
}

fn optional_text(parent: XmlElement, name: &str, value: Option<&String>) -> XmlElement {
    match value {
        Some(v) => parent.child(XmlElement::text_element(name, v.as_str())),
        None => parent,
    }
}

impl Envelope {
    /// Serialize through the canonical XML writer.
    pub fn to_xml(&self) -> String {
        let header = &self.header;
        let applicant = &header.applicant;
        let procedure = &applicant.procedure;

        let submission = XmlElement::new("submission")
            .attr("id", header.submission_id.as_str())
            .attr("sequence", header.sequence_number.as_padded())
            .attr("type", procedure.submission_type.as_str())
            .attr("built-at", header.built_at.to_iso8601());

        let applicant_el = XmlElement::new("applicant")
            .child(XmlElement::text_element("name", applicant.name.as_str()));
        let applicant_el = optional_text(applicant_el, "id", applicant.applicant_id.as_ref());
        let applicant_el = optional_text(applicant_el, "contact", applicant.contact_email.as_ref());

        let mut procedure_el = XmlElement::new("procedure")
            .attr("application-number", procedure.application_number.as_str())
            .attr("application-type", procedure.application_type.as_str());
        if let Some(kind) = &procedure.procedure_type {
            procedure_el = procedure_el.attr("procedure-type", kind.as_str());
        }
        let procedure_el =
            optional_text(procedure_el, "product-name", procedure.product_name.as_ref());

        let inventory = self.inventory.iter().fold(
            XmlElement::new("inventory").attr("count", self.inventory.len().to_string()),
            |inv, item| {
                let mut doc = XmlElement::new("document")
                    .attr("href", item.href.as_str())
                    .attr("operation", item.operation.as_str())
                    .attr("checksum", item.checksum.to_hex())
                    .attr("checksumType", CHECKSUM_TYPE);
                if let Some(module) = &item.module_code {
                    doc = doc.attr("module", module.as_str());
                }
                inv.child(doc.child(XmlElement::text_element("title", item.title.as_str())))
            },
        );

        let root = XmlElement::new(self.root.as_str())
            .attr("region", header.region.as_str())
            .attr("dtd-version", header.dtd_version.as_str())
            .child(submission)
            .child(applicant_el)
            .child(procedure_el)
            .child(inventory);
        XmlDocument::new(root).to_xml_string()
    }
}
