//! Health handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::web::dto::MirrorHealthResponse;
use crate::web::handlers::AppState;

/// GET /health - Liveness check.
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /api/health/mirror - Mirror failure stats.
#[utoipa::path(
    get,
    path = "/api/health/mirror",
    tag = "health",
    responses(
        (status = 200, description = "Mirror failure counters", body = MirrorHealthResponse)
    )
)]
pub async fn mirror_health(State(state): State<Arc<AppState>>) -> Json<MirrorHealthResponse> {
    Json(MirrorHealthResponse::from(state.storage.mirror_reporter().stats()))
}
