//! Event model

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::utils::helpers::{datetime_format, option_datetime_format};

/// Publication state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "event_state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventState {
    Pending,
    Published,
    Canceled,
}

impl EventState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventState::Pending => "PENDING",
            EventState::Published => "PUBLISHED",
            EventState::Canceled => "CANCELED",
        }
    }

    /// Content edits are only allowed before publication
    pub fn is_editable(&self) -> bool {
        matches!(self, EventState::Pending | EventState::Canceled)
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(EventState::Pending),
            "PUBLISHED" => Ok(EventState::Published),
            "CANCELED" => Ok(EventState::Canceled),
            other => Err(format!("Unknown event state: {}", other)),
        }
    }
}

/// State change requested alongside an event update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateAction {
    SendToReview,
    CancelReview,
    PublishEvent,
    RejectEvent,
}

impl StateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateAction::SendToReview => "SEND_TO_REVIEW",
            StateAction::CancelReview => "CANCEL_REVIEW",
            StateAction::PublishEvent => "PUBLISH_EVENT",
            StateAction::RejectEvent => "REJECT_EVENT",
        }
    }
}

impl fmt::Display for StateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is changing an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Initiator,
    Admin,
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRole::Initiator => f.write_str("initiator"),
            ActorRole::Admin => f.write_str("admin"),
        }
    }
}

/// Venue coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub annotation: String,
    #[sqlx(rename = "category_id")]
    pub category: i64,
    pub description: String,
    #[serde(with = "datetime_format")]
    pub event_date: NaiveDateTime,
    #[sqlx(flatten)]
    pub location: Location,
    pub paid: bool,
    pub participant_limit: i32,
    pub confirmed_requests: i32,
    pub request_moderation: bool,
    pub title: String,
    #[serde(with = "datetime_format")]
    pub created_on: NaiveDateTime,
    #[sqlx(rename = "initiator_id")]
    pub initiator: i64,
    #[serde(with = "option_datetime_format")]
    pub published_on: Option<NaiveDateTime>,
    pub state: EventState,
    pub views: i64,
    #[serde(skip)]
    pub version: i64,
}

impl Event {
    /// Canonical URI the statistics service tracks hits under
    pub fn uri(&self) -> String {
        event_uri(self.id)
    }

    pub fn is_unlimited(&self) -> bool {
        self.participant_limit == 0
    }

    /// No confirmed seat is left
    pub fn is_full(&self) -> bool {
        self.participant_limit > 0 && self.confirmed_requests >= self.participant_limit
    }

    /// Seats left before the limit is reached, `None` when unlimited
    pub fn remaining_capacity(&self) -> Option<i32> {
        if self.is_unlimited() {
            None
        } else {
            Some((self.participant_limit - self.confirmed_requests).max(0))
        }
    }

    /// Whether new participants are admitted without organizer approval
    pub fn auto_confirms(&self) -> bool {
        self.is_unlimited() || !self.request_moderation
    }

    /// Copy every present field of `update` onto the event.
    ///
    /// State, counters and timestamps are not touched here.
    pub fn apply_update(&mut self, update: &UpdateEventRequest) {
        if let Some(annotation) = update.annotation.as_ref().filter(|s| !s.trim().is_empty()) {
            self.annotation = annotation.clone();
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(description) = update.description.as_ref().filter(|s| !s.trim().is_empty()) {
            self.description = description.clone();
        }
        if let Some(event_date) = update.event_date {
            self.event_date = event_date;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        if let Some(paid) = update.paid {
            self.paid = paid;
        }
        if let Some(limit) = update.participant_limit {
            self.participant_limit = limit;
        }
        if let Some(moderation) = update.request_moderation {
            self.request_moderation = moderation;
        }
        if let Some(title) = update.title.as_ref().filter(|s| !s.trim().is_empty()) {
            self.title = title.clone();
        }
    }
}

pub fn event_uri(event_id: i64) -> String {
    format!("/events/{}", event_id)
}

pub(crate) fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Body of `POST /users/{userId}/events`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewEventRequest {
    #[validate(length(min = 20, max = 2000), custom(function = "non_blank"))]
    pub annotation: String,
    #[validate(range(min = 1))]
    pub category: i64,
    #[validate(length(min = 20, max = 7000), custom(function = "non_blank"))]
    pub description: String,
    #[serde(with = "datetime_format")]
    pub event_date: NaiveDateTime,
    pub location: Location,
    #[serde(default)]
    pub paid: Option<bool>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub participant_limit: Option<i32>,
    #[serde(default)]
    pub request_moderation: Option<bool>,
    #[validate(length(min = 3, max = 120), custom(function = "non_blank"))]
    pub title: String,
}

/// Body of the initiator and admin `PATCH` event endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default)]
    #[validate(length(min = 20, max = 2000))]
    pub annotation: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1))]
    pub category: Option<i64>,
    #[serde(default)]
    #[validate(length(min = 20, max = 7000))]
    pub description: Option<String>,
    #[serde(default, with = "option_datetime_format")]
    pub event_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub paid: Option<bool>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub participant_limit: Option<i32>,
    #[serde(default)]
    pub request_moderation: Option<bool>,
    #[serde(default)]
    pub state_action: Option<StateAction>,
    #[serde(default)]
    #[validate(length(min = 3, max = 120))]
    pub title: Option<String>,
}

impl UpdateEventRequest {
    /// Whether any content field is being changed
    pub fn has_field_changes(&self) -> bool {
        self.annotation.is_some()
            || self.category.is_some()
            || self.description.is_some()
            || self.event_date.is_some()
            || self.location.is_some()
            || self.paid.is_some()
            || self.participant_limit.is_some()
            || self.request_moderation.is_some()
            || self.title.is_some()
    }
}

/// Fully-resolved event ready to be inserted by a store
#[derive(Debug, Clone)]
pub struct NewEventRecord {
    pub annotation: String,
    pub category: i64,
    pub description: String,
    pub event_date: NaiveDateTime,
    pub location: Location,
    pub paid: bool,
    pub participant_limit: i32,
    pub request_moderation: bool,
    pub title: String,
    pub created_on: NaiveDateTime,
    pub initiator: i64,
    pub state: EventState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_event() -> Event {
        let now = crate::utils::helpers::now();
        Event {
            id: 7,
            annotation: "Evening swing social with live band".to_string(),
            category: 1,
            description: "A long description of the evening social dance".to_string(),
            event_date: now + Duration::days(3),
            location: Location { lat: 55.75, lon: 37.61 },
            paid: false,
            participant_limit: 2,
            confirmed_requests: 1,
            request_moderation: true,
            title: "Swing Social".to_string(),
            created_on: now,
            initiator: 1,
            published_on: None,
            state: EventState::Pending,
            views: 0,
            version: 0,
        }
    }

    #[test]
    fn test_capacity_helpers() {
        let mut event = sample_event();
        assert!(!event.is_full());
        assert_eq!(event.remaining_capacity(), Some(1));
        assert!(!event.auto_confirms());

        event.confirmed_requests = 2;
        assert!(event.is_full());
        assert_eq!(event.remaining_capacity(), Some(0));

        event.participant_limit = 0;
        assert!(!event.is_full());
        assert_eq!(event.remaining_capacity(), None);
        assert!(event.auto_confirms());
    }

    #[test]
    fn test_apply_update_skips_blank_text() {
        let mut event = sample_event();
        let update = UpdateEventRequest {
            title: Some("   ".to_string()),
            paid: Some(true),
            participant_limit: Some(10),
            ..Default::default()
        };
        event.apply_update(&update);
        assert_eq!(event.title, "Swing Social");
        assert!(event.paid);
        assert_eq!(event.participant_limit, 10);
        assert_eq!(event.state, EventState::Pending);
    }

    #[test]
    fn test_event_json_shape() {
        let event = sample_event();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["state"], "PENDING");
        assert_eq!(json["participantLimit"], 2);
        assert!(json["publishedOn"].is_null());
        assert!(json.get("version").is_none());
        assert_eq!(event.uri(), "/events/7");
    }

    #[test]
    fn test_new_event_validation() {
        let request = NewEventRequest {
            annotation: "too short".to_string(),
            category: 1,
            description: "A long description of the evening social dance".to_string(),
            event_date: crate::utils::helpers::now(),
            location: Location { lat: 0.0, lon: 0.0 },
            paid: None,
            participant_limit: Some(-1),
            request_moderation: None,
            title: "Swing Social".to_string(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("annotation"));
        assert!(fields.contains_key("participant_limit"));
        assert!(!fields.contains_key("title"));
    }

    #[test]
    fn test_state_action_wire_names() {
        let action: StateAction = serde_json::from_str("\"PUBLISH_EVENT\"").unwrap();
        assert_eq!(action, StateAction::PublishEvent);
        assert_eq!("CANCELED".parse::<EventState>().unwrap(), EventState::Canceled);
    }
}
