//! # Request Extraction
//!
//! JSON bodies and path identifiers are parsed here so handlers only see
//! validated domain types.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use ectd_core::{SequenceKey, SequenceNumber, SubmissionId};

use crate::error::AppError;

/// Request types with rules beyond what serde checks.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Build a sequence key from the `{submission}/{sequence}` path segments.
pub fn sequence_key(submission: &str, sequence: &str) -> Result<SequenceKey, AppError> {
    Ok(SequenceKey::new(
        SubmissionId::new(submission)?,
        SequenceNumber::parse(sequence)?,
    ))
}
