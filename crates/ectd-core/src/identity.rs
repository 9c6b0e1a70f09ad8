//! # Identity Newtypes
//!
//! Validated identifiers for submissions, sequences, and documents.
//!
//! A [`SubmissionId`] and a [`SequenceNumber`] both become directory names
//! under the output base (`<base>/<submissionId>/<sequenceNumber>/`), so
//! their constructors reject anything that could escape that layout: path
//! separators, dot segments, leading dots, and control characters.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EctdError;

/// Identifier of a submission (application/product). Used as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubmissionId(String);

impl SubmissionId {
    /// Validate and wrap a submission identifier.
    pub fn new(s: impl Into<String>) -> Result<Self, EctdError> {
        let s = s.into();
        if s.is_empty() {
            return Err(EctdError::Validation(
                "submission identifier must not be empty".to_string(),
            ));
        }
        if s.starts_with('.') {
            return Err(EctdError::Validation(format!(
                "submission identifier must not start with '.': {s:?}"
            )));
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(EctdError::Validation(format!(
                "submission identifier {s:?} contains invalid character {c:?}"
            )));
        }
        Ok(Self(s))
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubmissionId {
    type Error = EctdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SubmissionId> for String {
    fn from(id: SubmissionId) -> Self {
        id.0
    }
}

impl FromStr for SubmissionId {
    type Err = EctdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Four-digit sequence number, rendered zero-padded (`0000`–`9999`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SequenceNumber(u16);

impl SequenceNumber {
    /// Largest representable sequence number.
    pub const MAX: u16 = 9999;

    /// Construct from an integer in `0..=9999`.
    pub fn new(value: u16) -> Result<Self, EctdError> {
        if value > Self::MAX {
            return Err(EctdError::Validation(format!(
                "sequence number {value} exceeds {}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    /// Parse the four-digit, zero-padded form (e.g. `"0001"`).
    pub fn parse(s: &str) -> Result<Self, EctdError> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EctdError::Validation(format!(
                "sequence number must be exactly four digits, got {s:?}"
            )));
        }
        let value: u16 = s
            .parse()
            .map_err(|e| EctdError::Validation(format!("invalid sequence number {s:?}: {e}")))?;
        Self::new(value)
    }

    /// The numeric value.
    pub fn value(&self) -> u16 {
        self.0
    }

    /// The zero-padded directory name.
    pub fn as_padded(&self) -> String {
        format!("{:04}", self.0)
    }
}

impl TryFrom<String> for SequenceNumber {
    type Error = EctdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<SequenceNumber> for String {
    fn from(n: SequenceNumber) -> Self {
        n.as_padded()
    }
}

impl FromStr for SequenceNumber {
    type Err = EctdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Fully-qualified sequence reference: `<submissionId>/<sequenceNumber>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    /// The owning submission.
    pub submission_id: SubmissionId,
    /// The sequence within the submission.
    pub sequence_number: SequenceNumber,
}

impl SequenceKey {
    /// Pair a submission with one of its sequences.
    pub fn new(submission_id: SubmissionId, sequence_number: SequenceNumber) -> Self {
        Self {
            submission_id,
            sequence_number,
        }
    }
}

impl FromStr for SequenceKey {
    type Err = EctdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (submission, sequence) = s.split_once('/').ok_or_else(|| {
            EctdError::Validation(format!(
                "sequence reference must be <submission>/<sequence>, got {s:?}"
            ))
        })?;
        Ok(Self::new(
            SubmissionId::new(submission)?,
            SequenceNumber::parse(sequence)?,
        ))
    }
}

impl std::fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.submission_id, self.sequence_number)
    }
}

/// Identifier of a document in the external document store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap a non-empty document identifier.
    pub fn new(s: impl Into<String>) -> Result<Self, EctdError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(EctdError::Validation(
                "document identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(s))
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = EctdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
