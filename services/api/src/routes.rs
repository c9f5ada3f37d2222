use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use carelink::integrations::BlobError;
use carelink::marketplace::{marketplace_router, MarketplaceService};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

pub(crate) fn with_operational_routes(service: Arc<MarketplaceService>) -> Router {
    marketplace_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/uploads/*key", get(upload_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(std::sync::atomic::Ordering::Acquire) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Serves stored verification documents under the public upload base URL.
pub(crate) async fn upload_endpoint(
    Extension(state): Extension<AppState>,
    Path(key): Path<String>,
) -> Response {
    match state.blobs.read(&key) {
        Ok(bytes) => {
            let content_type = mime_guess::from_path(&key).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, content_type.essence_str().to_string())],
                bytes,
            )
                .into_response()
        }
        Err(BlobError::NotFound(_) | BlobError::InvalidKey(_)) => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            error!(%key, error = %err, "failed to read upload");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
