//! Participation request endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::extract::{ApiQuery, ValidatedJson};
use super::AppState;
use crate::models::{ParticipationRequest, StatusUpdateRequest, StatusUpdateResult};
use crate::utils::errors::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuery {
    pub event_id: i64,
}

/// `GET /users/{userId}/requests`
pub async fn list_own_requests(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<ParticipationRequest>>> {
    let requests = state.services.admission_service.list_for_requester(user_id).await?;
    Ok(Json(requests))
}

/// `POST /users/{userId}/requests?eventId=`
pub async fn submit_request(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    ApiQuery(query): ApiQuery<SubmitQuery>,
) -> Result<(StatusCode, Json<ParticipationRequest>)> {
    let request = state
        .services
        .admission_service
        .submit(user_id, query.event_id)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// `PATCH /users/{userId}/requests/{requestId}/cancel`
pub async fn cancel_request(
    State(state): State<AppState>,
    Path((user_id, request_id)): Path<(i64, i64)>,
) -> Result<Json<ParticipationRequest>> {
    let request = state
        .services
        .admission_service
        .cancel(user_id, request_id)
        .await?;
    Ok(Json(request))
}

/// `GET /users/{userId}/events/{eventId}/requests`
pub async fn list_event_requests(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<ParticipationRequest>>> {
    let requests = state
        .services
        .admission_service
        .list_for_event(user_id, event_id)
        .await?;
    Ok(Json(requests))
}

/// `PATCH /users/{userId}/events/{eventId}/requests`
pub async fn resolve_requests(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
    ValidatedJson(update): ValidatedJson<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResult>> {
    let result = state
        .services
        .admission_service
        .resolve_batch(user_id, event_id, update)
        .await?;
    Ok(Json(result))
}
