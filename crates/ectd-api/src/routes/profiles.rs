//! Regional profiles and the mandatory-module query.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use ectd_core::RegionCode;
use ectd_profile::{missing_modules, SubmissionProfile};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MissingModulesRequest {
    pub modules: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MissingModulesResponse {
    pub region: RegionCode,
    pub missing: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/profiles/:region", get(get_profile))
        .route("/v1/regions/:region/missing-modules", post(post_missing_modules))
}

/// GET /v1/profiles/:region
async fn get_profile(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Result<Json<SubmissionProfile>, AppError> {
    Ok(Json(state.registry.profile_for_code(&region)?.clone()))
}

/// POST /v1/regions/:region/missing-modules
async fn post_missing_modules(
    State(state): State<AppState>,
    Path(region): Path<String>,
    body: Result<Json<MissingModulesRequest>, JsonRejection>,
) -> Result<Json<MissingModulesResponse>, AppError> {
    let region: RegionCode = region.parse()?;
    let req = extract_json(body)?;
    let missing = missing_modules(&state.registry, region, &req.modules)?;
    Ok(Json(MissingModulesResponse { region, missing }))
}
