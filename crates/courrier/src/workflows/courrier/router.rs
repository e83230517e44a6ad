use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Actor, Completion, CourrierDraft, CourrierError, CourrierId, Priorite, Statut, UserId,
};
use super::imputation::ImputationRequest;
use super::repository::{CategoryDirectory, CourrierFilter, CourrierStore, ServiceDirectory};
use super::service::CourrierWorkflow;

/// Header carrying the acting user's id on every mutating request.
pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub to: Statut,
    #[serde(default)]
    pub completion: Option<Completion>,
}

#[derive(Debug, Deserialize)]
pub struct PrioriteRequest {
    pub priorite: Priorite,
}

/// Router exposing registration, imputation, transitions and priority changes.
pub fn courrier_router<S, D>(workflow: Arc<CourrierWorkflow<S, D>>) -> Router
where
    S: CourrierStore + 'static,
    D: ServiceDirectory + CategoryDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/courriers",
            post(register_handler::<S, D>).get(list_handler::<S, D>),
        )
        .route("/api/v1/courriers/:courrier_id", get(get_handler::<S, D>))
        .route(
            "/api/v1/courriers/:courrier_id/imputations",
            post(imputation_handler::<S, D>),
        )
        .route(
            "/api/v1/courriers/:courrier_id/transitions",
            post(transition_handler::<S, D>).get(history_handler::<S, D>),
        )
        .route(
            "/api/v1/courriers/:courrier_id/priorite",
            put(priorite_handler::<S, D>),
        )
        .with_state(workflow)
}

/// HTTP status surfaced for each domain failure.
pub fn status_for(error: &CourrierError) -> StatusCode {
    match error {
        CourrierError::InvalidTransition { .. } | CourrierError::TerminalStateViolation => {
            StatusCode::CONFLICT
        }
        CourrierError::ServiceNotFound(_) | CourrierError::NotFound(_) => StatusCode::NOT_FOUND,
        CourrierError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CourrierError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub(crate) fn error_response(error: CourrierError) -> Response {
    let status = status_for(&error);
    let payload = json!({
        "error": error.to_string(),
        "retryable": error.is_retryable(),
    });
    (status, axum::Json(payload)).into_response()
}

fn actor_from(headers: &HeaderMap) -> Result<Actor, Response> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|id| Actor::new(UserId(id)))
        .ok_or_else(|| {
            let payload = json!({
                "error": format!("missing or invalid {ACTOR_HEADER} header"),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        })
}

pub(crate) async fn register_handler<S, D>(
    State(workflow): State<Arc<CourrierWorkflow<S, D>>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<CourrierDraft>,
) -> Response
where
    S: CourrierStore + 'static,
    D: ServiceDirectory + CategoryDirectory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match workflow.register(draft, &actor, Utc::now()) {
        Ok(courrier) => (StatusCode::CREATED, axum::Json(courrier)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<S, D>(
    State(workflow): State<Arc<CourrierWorkflow<S, D>>>,
    Query(filter): Query<CourrierFilter>,
) -> Response
where
    S: CourrierStore + 'static,
    D: ServiceDirectory + CategoryDirectory + 'static,
{
    match workflow.list(&filter) {
        Ok(courriers) => (StatusCode::OK, axum::Json(courriers)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<S, D>(
    State(workflow): State<Arc<CourrierWorkflow<S, D>>>,
    Path(courrier_id): Path<u64>,
) -> Response
where
    S: CourrierStore + 'static,
    D: ServiceDirectory + CategoryDirectory + 'static,
{
    match workflow.get(&CourrierId(courrier_id)) {
        Ok(courrier) => (StatusCode::OK, axum::Json(courrier)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn imputation_handler<S, D>(
    State(workflow): State<Arc<CourrierWorkflow<S, D>>>,
    Path(courrier_id): Path<u64>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ImputationRequest>,
) -> Response
where
    S: CourrierStore + 'static,
    D: ServiceDirectory + CategoryDirectory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match workflow.imputer(&CourrierId(courrier_id), request, &actor, Utc::now()) {
        Ok(imputation) => (StatusCode::OK, axum::Json(imputation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transition_handler<S, D>(
    State(workflow): State<Arc<CourrierWorkflow<S, D>>>,
    Path(courrier_id): Path<u64>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    S: CourrierStore + 'static,
    D: ServiceDirectory + CategoryDirectory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match workflow.transition(
        &CourrierId(courrier_id),
        request.to,
        request.completion,
        &actor,
        Utc::now(),
    ) {
        Ok(courrier) => (StatusCode::OK, axum::Json(courrier)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<S, D>(
    State(workflow): State<Arc<CourrierWorkflow<S, D>>>,
    Path(courrier_id): Path<u64>,
) -> Response
where
    S: CourrierStore + 'static,
    D: ServiceDirectory + CategoryDirectory + 'static,
{
    let id = CourrierId(courrier_id);
    if let Err(error) = workflow.get(&id) {
        return error_response(error);
    }
    (StatusCode::OK, axum::Json(workflow.history(&id))).into_response()
}

pub(crate) async fn priorite_handler<S, D>(
    State(workflow): State<Arc<CourrierWorkflow<S, D>>>,
    Path(courrier_id): Path<u64>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<PrioriteRequest>,
) -> Response
where
    S: CourrierStore + 'static,
    D: ServiceDirectory + CategoryDirectory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match workflow.change_priorite(&CourrierId(courrier_id), request.priorite, &actor) {
        Ok(courrier) => (StatusCode::OK, axum::Json(courrier)).into_response(),
        Err(error) => error_response(error),
    }
}
