//! HTTP API over the service registry.
//!
//! ## Endpoints
//!
//! ### Status (`/v1`)
//! - `GET /v1/status/{service}` - Current value, last update and expiry
//! - `PUT /v1/status/{service}` - Set value, body `{"value": "...", "expire": ms}`
//! - `DELETE /v1/status/{service}` - Remove a service
//! - `GET /v1/services` - Names in rotation order and the current index
//!
//! ### System
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics
//!
//! Service names must match `[A-Za-z0-9-]{1,32}`; anything else is answered
//! with 404, as if the route did not exist.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::board::Registry;
use crate::constants::MAX_BODY_SIZE_BYTES;
use crate::error::Error;
use crate::{logging, telemetry};

pub mod handlers;
pub mod types;

pub use types::*;

use handlers::{health, services_list, status_delete, status_get, status_put};

#[cfg(test)]
mod tests;

// =============================================================================
// App State
// =============================================================================

/// Shared application state for HTTP handlers.
pub(crate) struct AppState {
    registry: Registry,
    started_at: Instant,
}

type SharedState = Arc<AppState>;

// =============================================================================
// HTTP API Server
// =============================================================================

/// Builds the router for `registry`.
pub fn router(registry: Registry) -> Router {
    let state = Arc::new(AppState {
        registry,
        started_at: Instant::now(),
    });

    Router::new()
        .route(
            "/v1/status/{service}",
            get(status_get).put(status_put).delete(status_delete),
        )
        .route("/v1/services", get(services_list))
        // Observability
        .route("/metrics", get(metrics_endpoint))
        .route("/health", get(health))
        .with_state(state)
        // Values are at most 100 characters; anything large is not a status update
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .layer(middleware::from_fn(metrics_middleware))
}

/// Serves the API on `addr` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve<F>(addr: SocketAddr, registry: Registry, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping board...");
}

/// Middleware to record HTTP request metrics.
async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();

    telemetry::record_http_request(&method, &path, status, elapsed.as_secs_f64());
    logging::log_request_complete(
        &method,
        &path,
        status,
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
    );

    response
}

// =============================================================================
// Metrics Handler
// =============================================================================

/// GET /metrics - Prometheus metrics endpoint.
async fn metrics_endpoint() -> impl IntoResponse {
    let body = telemetry::render_metrics();
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

// =============================================================================
// Error Handling
// =============================================================================

/// Application error types for HTTP responses.
#[derive(Debug)]
pub(crate) enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let message = err.client_message().to_string();
        match err.status_code() {
            404 => Self::NotFound(message),
            400 => Self::BadRequest(message),
            _ => {
                tracing::error!(error = %err, "Request failed");
                Self::Internal(message)
            },
        }
    }
}
