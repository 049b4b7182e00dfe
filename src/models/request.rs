//! Participation request model

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use validator::Validate;

use crate::utils::helpers::datetime_format;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "request_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Confirmed,
    Rejected,
    Canceled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Confirmed => "CONFIRMED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Canceled => "CANCELED",
        }
    }

    /// Canceled requests do not block a new request for the same event
    pub fn is_active(&self) -> bool {
        !matches!(self, RequestStatus::Canceled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ParticipationRequest {
    pub id: i64,
    #[serde(with = "datetime_format")]
    pub created: NaiveDateTime,
    #[sqlx(rename = "event_id")]
    pub event: i64,
    #[sqlx(rename = "requester_id")]
    pub requester: i64,
    pub status: RequestStatus,
}

/// A request that has been decided but not stored yet
#[derive(Debug, Clone)]
pub struct NewParticipationRequest {
    pub requester: i64,
    pub event: i64,
    pub created: NaiveDateTime,
    pub status: RequestStatus,
}

/// Body of `PATCH /users/{userId}/events/{eventId}/requests`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    #[validate(length(min = 1))]
    pub request_ids: Vec<i64>,
    pub status: RequestStatus,
}

/// Outcome of a batch resolution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResult {
    pub confirmed_requests: Vec<ParticipationRequest>,
    pub rejected_requests: Vec<ParticipationRequest>,
}
