//! Router configuration.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::dto::{MirrorHealthResponse, UploadResponse};
use super::error::ErrorBody;
use super::handlers::{self, get_stored_file, health_check, mirror_health, upload_file, AppState};
use super::middleware::{create_cors_layer, security_headers};
use crate::storage::{MirrorFailure, MirrorStats, UploadKind, UploadResult};

/// Headroom on top of the file ceiling for multipart framing and form fields.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// OpenAPI document for the storage API.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::storage::upload_file,
        handlers::storage::get_stored_file,
        handlers::health::mirror_health,
    ),
    components(schemas(
        UploadResponse,
        UploadResult,
        UploadKind,
        MirrorHealthResponse,
        MirrorStats,
        MirrorFailure,
        ErrorBody
    )),
    tags(
        (name = "storage", description = "Media and report uploads"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let body_limit = usize::try_from(app_state.max_upload_size().saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    let upload_routes = Router::new()
        .route("/:kind", post(upload_file))
        .layer(DefaultBodyLimit::max(body_limit));

    let api_routes = Router::new()
        .nest("/uploads", upload_routes)
        .route("/storage/*path", get(get_stored_file))
        .route("/health/mirror", get(mirror_health));

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Create the OpenAPI document router.
pub fn create_openapi_router() -> Router {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
