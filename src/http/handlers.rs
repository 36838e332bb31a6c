//! Status and system handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};

use super::types::{
    EmptyResponse, HealthResponse, ServicesResponse, StatusResponse, StatusUpdate,
};
use super::{AppError, SharedState};
use crate::board::registry::validate_service_name;

/// Names outside the route pattern are treated like unknown routes.
fn checked_name(service: &str) -> Result<(), AppError> {
    validate_service_name(service).map_err(|_| AppError::NotFound("No such service".to_string()))
}

/// GET /v1/status/{service} - Current value of a service.
pub(crate) async fn status_get(
    State(state): State<SharedState>,
    Path(service): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    checked_name(&service)?;
    let status = state.registry.get(&service)?;
    Ok(Json(status.into()))
}

/// PUT /v1/status/{service} - Create or update a service.
///
/// Every successful update resets the expiry: the `expire` field (in
/// milliseconds) arms a new one, its absence clears it.
pub(crate) async fn status_put(
    State(state): State<SharedState>,
    Path(service): Path<String>,
    body: Bytes,
) -> Result<Json<EmptyResponse>, AppError> {
    checked_name(&service)?;
    let update = StatusUpdate::from_body(&body).map_err(AppError::BadRequest)?;

    state
        .registry
        .put(&service, &update.value, update.expire)?;

    Ok(Json(EmptyResponse::default()))
}

/// DELETE /v1/status/{service} - Remove a service.
pub(crate) async fn status_delete(
    State(state): State<SharedState>,
    Path(service): Path<String>,
) -> Result<Json<EmptyResponse>, AppError> {
    checked_name(&service)?;
    if state.registry.delete(&service) {
        Ok(Json(EmptyResponse::default()))
    } else {
        Err(AppError::NotFound("No such service".to_string()))
    }
}

/// GET /v1/services - Service names in rotation order.
pub(crate) async fn services_list(State(state): State<SharedState>) -> Json<ServicesResponse> {
    Json(state.registry.snapshot().into())
}

/// GET /health - Health check.
pub(crate) async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime: state.started_at.elapsed().as_secs(),
        services: state.registry.len(),
    })
}
