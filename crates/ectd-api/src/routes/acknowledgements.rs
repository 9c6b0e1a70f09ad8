//! Gateway acknowledgement surface.
//!
//! Every mutation is applied through the tracker's transition functions and
//! then written to the ledger, if one is configured. A failed ledger write
//! undoes the mutation.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use ectd_state::{AckEvent, AckStatusView};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, sequence_key, Validate};
use crate::state::AppState;

impl Validate for AckEvent {
    fn validate(&self) -> Result<(), String> {
        if self.receipt_path.trim().is_empty() {
            return Err("receipt_path must not be empty".to_string());
        }
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/sequences/:submission/:sequence/acknowledgement",
            post(register).get(status),
        )
        .route("/v1/sequences/:submission/:sequence/submit", post(submit))
        .route("/v1/sequences/:submission/:sequence/events", post(ingest_event))
}

/// POST /v1/sequences/:submission/:sequence/acknowledgement
async fn register(
    State(state): State<AppState>,
    Path((submission, sequence)): Path<(String, String)>,
) -> Result<(StatusCode, Json<AckStatusView>), AppError> {
    let key = sequence_key(&submission, &sequence)?;
    let view = state.mutate(&key, |t| t.register(key.clone()))?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /v1/sequences/:submission/:sequence/submit
async fn submit(
    State(state): State<AppState>,
    Path((submission, sequence)): Path<(String, String)>,
) -> Result<Json<AckStatusView>, AppError> {
    let key = sequence_key(&submission, &sequence)?;
    let view = state.mutate(&key, |t| t.mark_submitted(&key))?;
    Ok(Json(view))
}

/// POST /v1/sequences/:submission/:sequence/events
async fn ingest_event(
    State(state): State<AppState>,
    Path((submission, sequence)): Path<(String, String)>,
    body: Result<Json<AckEvent>, JsonRejection>,
) -> Result<Json<AckStatusView>, AppError> {
    let key = sequence_key(&submission, &sequence)?;
    let event = extract_validated_json(body)?;
    let view = state.mutate(&key, |t| t.apply(&key, &event))?;
    Ok(Json(view))
}

/// GET /v1/sequences/:submission/:sequence/acknowledgement
async fn status(
    State(state): State<AppState>,
    Path((submission, sequence)): Path<(String, String)>,
) -> Result<Json<AckStatusView>, AppError> {
    let key = sequence_key(&submission, &sequence)?;
    Ok(Json(state.tracker.status(&key)?))
}
