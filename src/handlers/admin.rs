//! Moderation endpoints under `/admin/events`

use axum::{
    extract::{Path, State},
    Json,
};

use super::extract::{ApiQuery, SearchQuery, ValidatedJson};
use super::AppState;
use crate::models::{Event, UpdateEventRequest};
use crate::utils::errors::Result;

/// `GET /admin/events`
pub async fn search_events(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<Event>>> {
    let params = query.into_parameters()?;
    let events = state.services.search_service.search_admin(&params).await?;
    Ok(Json(events))
}

/// `PATCH /admin/events/{eventId}`
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    ValidatedJson(update): ValidatedJson<UpdateEventRequest>,
) -> Result<Json<Event>> {
    let event = state
        .services
        .lifecycle_service
        .update_by_admin(event_id, update)
        .await?;
    Ok(Json(event))
}
