//! HTTP handlers
//!
//! This module wires the REST API onto the services.

pub mod admin;
pub mod events;
pub mod extract;
pub mod public;
pub mod requests;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, patch},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::logging::request_logging;
use crate::services::{ServiceFactory, ServiceHealthStatus};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub services: ServiceFactory,
}

impl AppState {
    pub fn new(services: ServiceFactory) -> Self {
        Self { services }
    }
}

/// Build the complete API router
pub fn create_router(state: AppState) -> Router {
    let initiator = Router::new()
        .route(
            "/users/{userId}/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/users/{userId}/events/{eventId}",
            get(events::get_event).patch(events::update_event),
        )
        .route(
            "/users/{userId}/events/{eventId}/requests",
            get(requests::list_event_requests).patch(requests::resolve_requests),
        );

    let participation = Router::new()
        .route(
            "/users/{userId}/requests",
            get(requests::list_own_requests).post(requests::submit_request),
        )
        .route(
            "/users/{userId}/requests/{requestId}/cancel",
            patch(requests::cancel_request),
        );

    let admin = Router::new()
        .route("/admin/events", get(admin::search_events))
        .route("/admin/events/{eventId}", patch(admin::update_event));

    let public = Router::new()
        .route("/events", get(public::search_events))
        .route("/events/{eventId}", get(public::get_event));

    Router::new()
        .route("/health", get(health))
        .merge(initiator)
        .merge(participation)
        .merge(admin)
        .merge(public)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /health`
async fn health(State(state): State<AppState>) -> (StatusCode, Json<ServiceHealthStatus>) {
    let status = state.services.health_check().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        tracing::warn!(issues = ?status.get_issues(), "Health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}
