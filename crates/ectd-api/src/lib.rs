//! # ectd-api — HTTP Surface for eCTD Sequences
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health/liveness` | process liveness |
//! | `GET /v1/profiles/:region` | the region's submission profile |
//! | `POST /v1/regions/:region/missing-modules` | mandatory modules absent from a module set |
//! | `POST /v1/sequences/:submission/:sequence/acknowledgement` | register a built sequence |
//! | `GET /v1/sequences/:submission/:sequence/acknowledgement` | tier receipts and status |
//! | `POST /v1/sequences/:submission/:sequence/submit` | mark as sent to the gateway |
//! | `POST /v1/sequences/:submission/:sequence/events` | ingest a tier 1/2/3 acknowledgement |
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; they delegate to `ectd-profile`
//!   and `ectd-state`.
//! - All errors map to structured HTTP responses via `AppError`.

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::profiles::router())
        .merge(routes::acknowledgements::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new().route("/health/liveness", axum::routing::get(liveness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}
