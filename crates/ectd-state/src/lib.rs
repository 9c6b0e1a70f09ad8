//! # ectd-state — Acknowledgement State Machine
//!
//! Tracks the gateway's three acknowledgement tiers for every submitted
//! sequence.
//!
//! ```text
//! CREATED ──▶ SUBMITTED ──▶ ACK1_RECEIVED ──▶ ACK2_RECEIVED ──▶ ACK3_RECEIVED (terminal)
//!                                  │
//!                                  └── tier 2 fail ──▶ REJECTED (terminal)
//! ```
//!
//! - [`acknowledgement`]: the per-sequence record and its transition
//!   functions. Fields are only ever changed through those functions.
//! - [`tracker`]: the keyed collection of records, one mutex per sequence,
//!   with JSON ledger persistence.
//!
//! ## Crate Policy
//!
//! - Rejected events never change state.
//! - Exact duplicate events are accepted as no-ops.

pub mod acknowledgement;
pub mod tracker;

pub use acknowledgement::{
    AckError, AckEvent, AckStatus, AckStatusView, AckTier, AckTransitionRecord, Acknowledgement,
};
pub use tracker::AcknowledgementTracker;
