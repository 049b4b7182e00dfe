//! Public event endpoints
//!
//! Both endpoints report a hit to the statistics service. Searches that fail
//! validation are not counted.

use axum::{
    extract::{OriginalUri, Path, State},
    Json,
};

use super::extract::{ApiQuery, ClientIp, SearchQuery};
use super::AppState;
use crate::models::{event_uri, Event};
use crate::utils::errors::Result;

/// `GET /events`
pub async fn search_events(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ClientIp(ip): ClientIp,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<Event>>> {
    let params = query.into_parameters()?;
    let events = state.services.search_service.search_public(&params).await?;

    state.services.view_annotator.record_hit(uri.path().to_string(), ip);
    Ok(Json(events))
}

/// `GET /events/{eventId}`
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    ClientIp(ip): ClientIp,
) -> Result<Json<Event>> {
    state.services.view_annotator.record_hit(event_uri(event_id), ip);

    let event = state.services.lifecycle_service.get_published(event_id).await?;
    Ok(Json(event))
}
