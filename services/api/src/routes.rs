use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::Extension;
use axum::Json;
use courrier::workflows::courrier::{
    courrier_router, CategoryDirectory, CourrierId, CourrierStore, CourrierWorkflow,
    ServiceDirectory, StoreError, ACTOR_HEADER,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) fn with_courrier_routes<S, D>(workflow: Arc<CourrierWorkflow<S, D>>) -> axum::Router
where
    S: CourrierStore + 'static,
    D: ServiceDirectory + CategoryDirectory + 'static,
{
    courrier_router(workflow)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/dashboard", get(dashboard_endpoint))
        .route(
            "/api/v1/courriers/:courrier_id",
            delete(delete_courrier_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Latest report published by the dashboard poller.
pub(crate) async fn dashboard_endpoint(Extension(state): Extension<AppState>) -> Response {
    match state.dashboard.latest() {
        Some(report) => (StatusCode::OK, Json(report)).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
            .into_response(),
    }
}

/// Administrative removal straight against the store. The courrier drops out
/// of the next dashboard refresh.
pub(crate) async fn delete_courrier_endpoint(
    Extension(state): Extension<AppState>,
    Path(courrier_id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    let Some(actor) = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("missing {ACTOR_HEADER} header") })),
        )
            .into_response();
    };

    let id = CourrierId(courrier_id);
    match state.store.delete(&id) {
        Ok(()) => {
            info!(courrier = %id, actor, "courrier deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(StoreError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("courrier {id} not found") })),
        )
            .into_response(),
        Err(err) => {
            warn!(courrier = %id, error = %err, "courrier deletion failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
