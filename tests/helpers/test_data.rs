//! Test data builders
//!
//! Seeded ids and request bodies shared across the integration tests.

use chrono::{Duration, NaiveDateTime};
use serde_json::{json, Value};

use eventhub::models::{
    Category, Location, NewEventRequest, RequestStatus, StateAction, StatusUpdateRequest,
    UpdateEventRequest, User,
};
use eventhub::utils::helpers::{format_timestamp, now};

/// Seeded user that organizes events in most tests
pub const INITIATOR_ID: i64 = 1;
/// Seeded users `1..=SEEDED_USERS` exist in every test store
pub const SEEDED_USERS: i64 = 40;
pub const CATEGORY_ID: i64 = 1;
pub const OTHER_CATEGORY_ID: i64 = 2;
pub const UNKNOWN_ID: i64 = 9_999;

pub fn test_user(id: i64) -> User {
    User {
        id,
        name: format!("Dancer {}", id),
        email: format!("dancer{}@example.com", id),
    }
}

pub fn test_categories() -> Vec<Category> {
    vec![
        Category {
            id: CATEGORY_ID,
            name: "Concerts".to_string(),
        },
        Category {
            id: OTHER_CATEGORY_ID,
            name: "Workshops".to_string(),
        },
    ]
}

pub fn in_days(days: i64) -> NaiveDateTime {
    now() + Duration::days(days)
}

/// A valid event five days out with no limit and moderation on
pub fn new_event_request(title: &str) -> NewEventRequest {
    NewEventRequest {
        annotation: format!("{} with a live band and a taster class", title),
        category: CATEGORY_ID,
        description: format!("{}: doors open at seven, bring comfortable shoes", title),
        event_date: in_days(5),
        location: Location { lat: 55.75, lon: 37.61 },
        paid: None,
        participant_limit: None,
        request_moderation: None,
        title: title.to_string(),
    }
}

pub fn new_event_json(title: &str, event_date: NaiveDateTime) -> Value {
    json!({
        "annotation": format!("{} with a live band and a taster class", title),
        "category": CATEGORY_ID,
        "description": format!("{}: doors open at seven, bring comfortable shoes", title),
        "eventDate": format_timestamp(event_date),
        "location": { "lat": 55.75, "lon": 37.61 },
        "participantLimit": 2,
        "title": title,
    })
}

pub fn state_change(action: StateAction) -> UpdateEventRequest {
    UpdateEventRequest {
        state_action: Some(action),
        ..Default::default()
    }
}

pub fn status_update(request_ids: &[i64], status: RequestStatus) -> StatusUpdateRequest {
    StatusUpdateRequest {
        request_ids: request_ids.to_vec(),
        status,
    }
}
