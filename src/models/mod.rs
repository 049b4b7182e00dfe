//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod event;
pub mod request;
pub mod search;
pub mod user;

// Re-export commonly used models
pub use event::{
    event_uri, ActorRole, Event, EventState, Location, NewEventRecord, NewEventRequest,
    StateAction, UpdateEventRequest,
};
pub use request::{
    NewParticipationRequest, ParticipationRequest, RequestStatus, StatusUpdateRequest,
    StatusUpdateResult,
};
pub use search::{EventPredicate, EventQuery, EventSearchParameters, PageRequest, SortMode};
pub use user::{Category, User};
