//! Event search model
//!
//! Search requests are compiled into an [`EventQuery`]: a conjunction of
//! independent [`EventPredicate`]s plus ordering and paging. Stores either
//! evaluate the predicates directly ([`EventPredicate::matches`]) or render
//! them into SQL.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::event::{Event, EventState};
use crate::utils::errors::{EventHubError, Result};

/// Parameter bag accepted by public and admin search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSearchParameters {
    pub text: Option<String>,
    pub categories: Option<Vec<i64>>,
    pub paid: Option<bool>,
    pub range_start: Option<NaiveDateTime>,
    pub range_end: Option<NaiveDateTime>,
    pub only_available: bool,
    pub sort: Option<SortMode>,
    pub from: i64,
    pub size: i64,
    /// Admin only: initiator ids
    pub users: Option<Vec<i64>>,
    /// Admin only: states
    pub states: Option<Vec<EventState>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortMode {
    EventDate,
    Views,
}

impl FromStr for SortMode {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EVENT_DATE" => Ok(SortMode::EventDate),
            "VIEWS" => Ok(SortMode::Views),
            other => Err(EventHubError::validation(format!(
                "Unknown sort mode: {}. Expected EVENT_DATE or VIEWS",
                other
            ))),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::EventDate => f.write_str("EVENT_DATE"),
            SortMode::Views => f.write_str("VIEWS"),
        }
    }
}

/// Page-index based paging as understood by the stores.
///
/// Callers speak in item offsets (`from`); the index is `from / size`, so
/// an offset that is not a multiple of `size` rounds down to the start of
/// its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub index: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn from_offset(from: i64, size: i64) -> Result<Self> {
        if size <= 0 {
            return Err(EventHubError::validation("Page size must be greater than 0"));
        }
        if from < 0 {
            return Err(EventHubError::validation("Parameter 'from' cannot be negative"));
        }
        Ok(Self {
            index: from / size,
            size,
        })
    }

    /// First item of the page
    pub fn offset(&self) -> i64 {
        self.index * self.size
    }
}

/// A single filter over events
#[derive(Debug, Clone, PartialEq)]
pub enum EventPredicate {
    /// Case-insensitive substring of annotation or description
    Text(String),
    Categories(Vec<i64>),
    Paid(bool),
    StartsAtOrAfter(NaiveDateTime),
    StartsAtOrBefore(NaiveDateTime),
    StartsAfter(NaiveDateTime),
    OnlyAvailable,
    States(Vec<EventState>),
    Initiators(Vec<i64>),
}

impl EventPredicate {
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            EventPredicate::Text(text) => {
                let needle = text.to_lowercase();
                event.annotation.to_lowercase().contains(&needle)
                    || event.description.to_lowercase().contains(&needle)
            }
            EventPredicate::Categories(ids) => ids.contains(&event.category),
            EventPredicate::Paid(paid) => event.paid == *paid,
            EventPredicate::StartsAtOrAfter(start) => event.event_date >= *start,
            EventPredicate::StartsAtOrBefore(end) => event.event_date <= *end,
            EventPredicate::StartsAfter(moment) => event.event_date > *moment,
            EventPredicate::OnlyAvailable => {
                event.confirmed_requests <= event.participant_limit || event.participant_limit <= 0
            }
            EventPredicate::States(states) => states.contains(&event.state),
            EventPredicate::Initiators(ids) => ids.contains(&event.initiator),
        }
    }
}

/// Compiled search executed by an `EventStore`
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub predicates: Vec<EventPredicate>,
    pub sort: Option<SortMode>,
    pub page: PageRequest,
}

impl EventQuery {
    pub fn matches(&self, event: &Event) -> bool {
        self.predicates.iter().all(|p| p.matches(event))
    }
}
