//! Initiator-facing event endpoints under `/users/{userId}/events`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::extract::{ApiQuery, PageQuery, ValidatedJson};
use super::AppState;
use crate::models::{Event, NewEventRequest, UpdateEventRequest};
use crate::utils::errors::Result;

/// `POST /users/{userId}/events`
pub async fn create_event(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    ValidatedJson(request): ValidatedJson<NewEventRequest>,
) -> Result<(StatusCode, Json<Event>)> {
    let event = state.services.lifecycle_service.create(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /users/{userId}/events`
pub async fn list_events(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<Vec<Event>>> {
    let events = state
        .services
        .lifecycle_service
        .list_for_initiator(user_id, page.from, page.size)
        .await?;
    Ok(Json(events))
}

/// `GET /users/{userId}/events/{eventId}`
pub async fn get_event(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
) -> Result<Json<Event>> {
    let event = state
        .services
        .lifecycle_service
        .get_for_initiator(user_id, event_id)
        .await?;
    Ok(Json(event))
}

/// `PATCH /users/{userId}/events/{eventId}`
pub async fn update_event(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
    ValidatedJson(update): ValidatedJson<UpdateEventRequest>,
) -> Result<Json<Event>> {
    let event = state
        .services
        .lifecycle_service
        .update_by_initiator(user_id, event_id, update)
        .await?;
    Ok(Json(event))
}
