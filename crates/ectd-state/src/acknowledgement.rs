//! # Acknowledgement Record
//!
//! One [`Acknowledgement`] per sequence. The three receipt paths and the
//! status are private to this module: they change only through
//! [`Acknowledgement::mark_submitted`] and [`Acknowledgement::apply`], so a
//! tier-N receipt always implies the tier-(N-1) receipt.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ectd_core::{EctdError, SequenceKey, Timestamp};

// ─── Status ─────────────────────────────────────────────────────────

/// Lifecycle status of a sequence at the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    /// Sequence built, not yet sent.
    #[serde(rename = "CREATED")]
    Created,
    /// Sent to the gateway.
    #[serde(rename = "SUBMITTED")]
    Submitted,
    /// Tier-1 (syntax) receipt received.
    #[serde(rename = "ACK1_RECEIVED")]
    Ack1Received,
    /// Tier-2 (content) receipt received with a pass.
    #[serde(rename = "ACK2_RECEIVED")]
    Ack2Received,
    /// Tier-3 receipt: final acceptance (terminal).
    #[serde(rename = "ACK3_RECEIVED")]
    Ack3Received,
    /// Tier-2 failure (terminal).
    #[serde(rename = "REJECTED")]
    Rejected,
}

impl AckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Submitted => "SUBMITTED",
            Self::Ack1Received => "ACK1_RECEIVED",
            Self::Ack2Received => "ACK2_RECEIVED",
            Self::Ack3Received => "ACK3_RECEIVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Whether no further events are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ack3Received | Self::Rejected)
    }
}

impl std::fmt::Display for AckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Events ─────────────────────────────────────────────────────────

/// Acknowledgement tier, serialized as `1`, `2`, or `3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AckTier {
    One,
    Two,
    Three,
}

impl AckTier {
    pub fn number(&self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

impl TryFrom<u8> for AckTier {
    type Error = AckError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(AckError::InvalidEvent(format!(
                "acknowledgement tier must be 1, 2 or 3, got {other}"
            ))),
        }
    }
}

impl From<AckTier> for u8 {
    fn from(tier: AckTier) -> Self {
        tier.number()
    }
}

impl std::fmt::Display for AckTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier {}", self.number())
    }
}

/// An inbound gateway acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckEvent {
    pub tier: AckTier,
    /// Path of the receipt artifact.
    pub receipt_path: String,
    /// Tier-2 verdict. Required for tier 2, ignored otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
}

impl AckEvent {
    pub fn tier1(receipt_path: impl Into<String>) -> Self {
        Self {
            tier: AckTier::One,
            receipt_path: receipt_path.into(),
            passed: None,
        }
    }

    pub fn tier2(receipt_path: impl Into<String>, passed: bool) -> Self {
        Self {
            tier: AckTier::Two,
            receipt_path: receipt_path.into(),
            passed: Some(passed),
        }
    }

    pub fn tier3(receipt_path: impl Into<String>) -> Self {
        Self {
            tier: AckTier::Three,
            receipt_path: receipt_path.into(),
            passed: None,
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AckError {
    #[error("no acknowledgement record for sequence {0}")]
    NotFound(String),

    #[error("acknowledgement record for sequence {0} already exists")]
    AlreadyRegistered(String),

    /// The event is not the next one the state machine expects.
    #[error("{event} is not valid in state {from}")]
    InvalidTransition {
        from: AckStatus,
        event: String,
    },

    /// The sequence is in a terminal state.
    #[error("sequence is in terminal state {state}")]
    AlreadyFinalized { state: AckStatus },

    /// The event itself is malformed.
    #[error("invalid acknowledgement event: {0}")]
    InvalidEvent(String),

    /// A persisted record violates the tier chain.
    #[error("inconsistent acknowledgement record {key}: {reason}")]
    Inconsistent { key: String, reason: String },
}

impl From<AckError> for EctdError {
    fn from(e: AckError) -> Self {
        let message = e.to_string();
        match e {
            AckError::NotFound(_) => EctdError::NotFound(message),
            AckError::AlreadyRegistered(_) => EctdError::Conflict(message),
            AckError::InvalidTransition { .. } => EctdError::InvalidTransition(message),
            AckError::AlreadyFinalized { .. } => EctdError::AlreadyFinalized(message),
            AckError::InvalidEvent(_) => EctdError::Validation(message),
            AckError::Inconsistent { .. } => EctdError::Serialization(message),
        }
    }
}

// ─── Record ─────────────────────────────────────────────────────────

/// One entry of the transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckTransitionRecord {
    pub from: AckStatus,
    pub to: AckStatus,
    /// The tier that caused the transition; `None` for submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<AckTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    pub timestamp: Timestamp,
}

/// The query-surface shape: three nullable receipt paths and a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckStatusView {
    pub tier1: Option<String>,
    pub tier2: Option<String>,
    pub tier3: Option<String>,
    pub status: AckStatus,
}

/// Gateway acknowledgement state of one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    key: SequenceKey,
    status: AckStatus,
    tier1: Option<String>,
    tier2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tier2_passed: Option<bool>,
    tier3: Option<String>,
    created_at: Timestamp,
    #[serde(default)]
    history: Vec<AckTransitionRecord>,
}

impl Acknowledgement {
    /// A fresh record in `CREATED`.
    pub fn new(key: SequenceKey) -> Self {
        Self {
            key,
            status: AckStatus::Created,
            tier1: None,
            tier2: None,
            tier2_passed: None,
            tier3: None,
            created_at: Timestamp::now(),
            history: Vec::new(),
        }
    }

    pub fn key(&self) -> &SequenceKey {
        &self.key
    }

    pub fn status(&self) -> AckStatus {
        self.status
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn history(&self) -> &[AckTransitionRecord] {
        &self.history
    }

    pub fn view(&self) -> AckStatusView {
        AckStatusView {
            tier1: self.tier1.clone(),
            tier2: self.tier2.clone(),
            tier3: self.tier3.clone(),
            status: self.status,
        }
    }

    /// CREATED → SUBMITTED.
    pub fn mark_submitted(&mut self) -> Result<(), AckError> {
        self.require_state(AckStatus::Created, "submission")?;
        self.do_transition(AckStatus::Submitted, None, None, None);
        Ok(())
    }

    /// Apply a gateway event. Returns `false` when the event was an exact
    /// duplicate of one already applied.
    pub fn apply(&mut self, event: &AckEvent) -> Result<bool, AckError> {
        if event.receipt_path.trim().is_empty() {
            return Err(AckError::InvalidEvent("receipt path is empty".to_string()));
        }
        let passed = match event.tier {
            AckTier::Two => Some(event.passed.ok_or_else(|| {
                AckError::InvalidEvent("tier 2 acknowledgement requires a pass/fail verdict".to_string())
            })?),
            AckTier::One | AckTier::Three => None,
        };

        if self.is_duplicate(event.tier, &event.receipt_path, passed) {
            return Ok(false);
        }

        let (expected, next) = match (event.tier, passed) {
            (AckTier::One, _) => (AckStatus::Submitted, AckStatus::Ack1Received),
            (AckTier::Two, Some(false)) => (AckStatus::Ack1Received, AckStatus::Rejected),
            (AckTier::Two, _) => (AckStatus::Ack1Received, AckStatus::Ack2Received),
            (AckTier::Three, _) => (AckStatus::Ack2Received, AckStatus::Ack3Received),
        };
        self.require_state(expected, &event.tier.to_string())?;

        let receipt = event.receipt_path.clone();
        match event.tier {
            AckTier::One => self.tier1 = Some(receipt.clone()),
            AckTier::Two => {
                self.tier2 = Some(receipt.clone());
                self.tier2_passed = passed;
            }
            AckTier::Three => self.tier3 = Some(receipt.clone()),
        }
        self.do_transition(next, Some(event.tier), Some(receipt), passed);
        Ok(true)
    }

    /// Check the tier chain of a record read from storage.
    pub fn check_consistency(&self) -> Result<(), AckError> {
        let inconsistent = |reason: &str| AckError::Inconsistent {
            key: self.key.to_string(),
            reason: reason.to_string(),
        };
        let (t1, t2, t3) = (self.tier1.is_some(), self.tier2.is_some(), self.tier3.is_some());
        if (t2 && !t1) || (t3 && !t2) {
            return Err(inconsistent("tier receipt recorded without the previous tier"));
        }
        let expected = match self.status {
            AckStatus::Created | AckStatus::Submitted => (false, false, false),
            AckStatus::Ack1Received => (true, false, false),
            AckStatus::Ack2Received | AckStatus::Rejected => (true, true, false),
            AckStatus::Ack3Received => (true, true, true),
        };
        if (t1, t2, t3) != expected {
            return Err(inconsistent("receipts do not match status"));
        }
        let verdict_ok = match self.status {
            AckStatus::Rejected => self.tier2_passed == Some(false),
            AckStatus::Ack2Received | AckStatus::Ack3Received => self.tier2_passed == Some(true),
            _ => self.tier2_passed.is_none(),
        };
        if !verdict_ok {
            return Err(inconsistent("tier 2 verdict does not match status"));
        }
        Ok(())
    }

    fn is_duplicate(&self, tier: AckTier, receipt: &str, passed: Option<bool>) -> bool {
        match tier {
            AckTier::One => self.tier1.as_deref() == Some(receipt),
            AckTier::Two => self.tier2.as_deref() == Some(receipt) && self.tier2_passed == passed,
            AckTier::Three => self.tier3.as_deref() == Some(receipt),
        }
    }

    fn require_state(&self, expected: AckStatus, event: &str) -> Result<(), AckError> {
        if self.status.is_terminal() {
            return Err(AckError::AlreadyFinalized { state: self.status });
        }
        if self.status != expected {
            return Err(AckError::InvalidTransition {
                from: self.status,
                event: event.to_string(),
            });
        }
        Ok(())
    }

    fn do_transition(
        &mut self,
        to: AckStatus,
        tier: Option<AckTier>,
        receipt_path: Option<String>,
        passed: Option<bool>,
    ) {
        self.history.push(AckTransitionRecord {
            from: self.status,
            to,
            tier,
            receipt_path,
            passed,
            timestamp: Timestamp::now(),
        });
        self.status = to;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted() -> Acknowledgement {
        let mut ack = Acknowledgement::new("PID/0001".parse().unwrap());
        ack.mark_submitted().unwrap();
        ack
    }

    #[test]
    fn happy_path_to_final_acceptance() {
        let mut ack = submitted();
        assert!(ack.apply(&AckEvent::tier1("r/ack1.xml")).unwrap());
        assert!(ack.apply(&AckEvent::tier2("r/ack2.xml", true)).unwrap());
        assert!(ack.apply(&AckEvent::tier3("r/ack3.xml")).unwrap());

        let view = ack.view();
        assert_eq!(view.status, AckStatus::Ack3Received);
        assert_eq!(view.tier1.as_deref(), Some("r/ack1.xml"));
        assert_eq!(view.tier3.as_deref(), Some("r/ack3.xml"));
        assert_eq!(ack.history().len(), 4);
        assert!(ack.check_consistency().is_ok());
    }

    #[test]
    fn tier3_before_tier2_is_rejected_without_change() {
        let mut ack = submitted();
        let err = ack.apply(&AckEvent::tier3("r/ack3.xml")).unwrap_err();
        assert!(matches!(err, AckError::InvalidTransition { from: AckStatus::Submitted, .. }));
        assert_eq!(ack.status(), AckStatus::Submitted);
        assert_eq!(ack.view().tier3, None);
        assert_eq!(ack.history().len(), 1);
    }

    #[test]
    fn failing_tier2_rejects_and_finalizes() {
        let mut ack = submitted();
        ack.apply(&AckEvent::tier1("r/ack1.xml")).unwrap();
        ack.apply(&AckEvent::tier2("r/ack2.xml", false)).unwrap();
        assert_eq!(ack.status(), AckStatus::Rejected);
        assert_eq!(ack.view().tier2.as_deref(), Some("r/ack2.xml"));

        let err = ack.apply(&AckEvent::tier3("r/ack3.xml")).unwrap_err();
        assert_eq!(err, AckError::AlreadyFinalized { state: AckStatus::Rejected });
        assert!(ack.check_consistency().is_ok());
    }

    #[test]
    fn exact_duplicates_are_no_ops() {
        let mut ack = submitted();
        ack.apply(&AckEvent::tier1("r/ack1.xml")).unwrap();
        assert!(!ack.apply(&AckEvent::tier1("r/ack1.xml")).unwrap());
        assert_eq!(ack.history().len(), 2);

        ack.apply(&AckEvent::tier2("r/ack2.xml", false)).unwrap();
        assert!(!ack.apply(&AckEvent::tier2("r/ack2.xml", false)).unwrap());

        // Same artifact, different verdict is not a duplicate.
        let err = ack.apply(&AckEvent::tier2("r/ack2.xml", true)).unwrap_err();
        assert!(matches!(err, AckError::AlreadyFinalized { .. }));
    }

    #[test]
    fn different_artifact_for_same_tier_is_invalid() {
        let mut ack = submitted();
        ack.apply(&AckEvent::tier1("r/a.xml")).unwrap();
        let err = ack.apply(&AckEvent::tier1("r/b.xml")).unwrap_err();
        assert!(matches!(err, AckError::InvalidTransition { .. }));
        assert_eq!(ack.view().tier1.as_deref(), Some("r/a.xml"));
    }

    #[test]
    fn events_before_submission_are_invalid() {
        let mut ack = Acknowledgement::new("PID/0001".parse().unwrap());
        let err = ack.apply(&AckEvent::tier1("r/a.xml")).unwrap_err();
        assert!(matches!(err, AckError::InvalidTransition { from: AckStatus::Created, .. }));

        ack.mark_submitted().unwrap();
        assert!(matches!(
            ack.mark_submitted().unwrap_err(),
            AckError::InvalidTransition { .. }
        ));
    }

    #[test]
    fn malformed_events() {
        let mut ack = submitted();
        let err = ack.apply(&AckEvent::tier1("  ")).unwrap_err();
        assert!(matches!(err, AckError::InvalidEvent(_)));

        ack.apply(&AckEvent::tier1("r/a.xml")).unwrap();
        let no_verdict = AckEvent {
            tier: AckTier::Two,
            receipt_path: "r/b.xml".to_string(),
            passed: None,
        };
        assert!(matches!(ack.apply(&no_verdict).unwrap_err(), AckError::InvalidEvent(_)));
        assert_eq!(ack.status(), AckStatus::Ack1Received);
    }

    #[test]
    fn error_kinds() {
        use ectd_core::ErrorKind;
        let kind = |e: AckError| EctdError::from(e).kind();
        assert_eq!(kind(AckError::NotFound("k".into())), ErrorKind::NotFound);
        assert_eq!(kind(AckError::AlreadyRegistered("k".into())), ErrorKind::Conflict);
        assert_eq!(
            kind(AckError::AlreadyFinalized { state: AckStatus::Rejected }),
            ErrorKind::AlreadyFinalized
        );
        assert_eq!(
            kind(AckError::InvalidTransition {
                from: AckStatus::Created,
                event: "tier 1".into()
            }),
            ErrorKind::InvalidTransition
        );
        assert_eq!(kind(AckError::InvalidEvent("x".into())), ErrorKind::Validation);
    }

    #[test]
    fn status_and_tier_wire_names() {
        assert_eq!(
            serde_json::to_string(&AckStatus::Ack1Received).unwrap(),
            "\"ACK1_RECEIVED\""
        );
        let event: AckEvent =
            serde_json::from_str(r#"{"tier": 2, "receipt_path": "r.xml", "passed": false}"#).unwrap();
        assert_eq!(event, AckEvent::tier2("r.xml", false));
        assert!(serde_json::from_str::<AckEvent>(r#"{"tier": 4, "receipt_path": "r.xml"}"#).is_err());
    }
}
