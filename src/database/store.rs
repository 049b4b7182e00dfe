//! Storage abstraction shared by the PostgreSQL and in-memory backends

use async_trait::async_trait;

use crate::models::{
    Category, Event, EventQuery, NewEventRecord, NewParticipationRequest, PageRequest,
    ParticipationRequest, RequestStatus, User,
};
use crate::utils::errors::Result;

/// Outcome of a version-checked write
#[derive(Debug, Clone, PartialEq)]
pub enum Versioned<T> {
    Committed(T),
    /// The event changed since it was read; nothing was written
    Stale,
}

impl<T> Versioned<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Versioned::Stale)
    }
}

/// Everything an admission decision writes, applied atomically
#[derive(Debug, Clone)]
pub struct AdmissionCommit {
    pub event_id: i64,
    /// Version the decision was based on
    pub expected_version: i64,
    /// New value of the event's confirmed counter
    pub confirmed_requests: i32,
    pub inserts: Vec<NewParticipationRequest>,
    /// `(request id, new status)`
    pub status_changes: Vec<(i64, RequestStatus)>,
}

impl AdmissionCommit {
    pub fn new(event: &Event) -> Self {
        Self {
            event_id: event.id,
            expected_version: event.version,
            confirmed_requests: event.confirmed_requests,
            inserts: Vec::new(),
            status_changes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionReceipt {
    pub event: Event,
    pub inserted: Vec<ParticipationRequest>,
    /// Updated requests, in the order of `status_changes`
    pub updated: Vec<ParticipationRequest>,
}

/// Persistence for events and participation requests
///
/// Only [`EventStore::commit_admission`] writes `confirmed_requests`;
/// [`EventStore::save_event`] writes content and state, and
/// [`EventStore::record_views`] writes nothing but `views`.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_user(&self, id: i64) -> Result<Option<User>>;

    async fn find_category(&self, id: i64) -> Result<Option<Category>>;

    async fn insert_event(&self, record: NewEventRecord) -> Result<Event>;

    async fn find_event(&self, id: i64) -> Result<Option<Event>>;

    async fn list_events_by_initiator(&self, initiator: i64, page: PageRequest) -> Result<Vec<Event>>;

    /// Save content fields, state and `published_on` if `event.version` is current
    async fn save_event(&self, event: &Event) -> Result<Versioned<Event>>;

    async fn search(&self, query: &EventQuery) -> Result<Vec<Event>>;

    async fn record_views(&self, event_id: i64, views: i64) -> Result<()>;

    async fn find_request(&self, id: i64) -> Result<Option<ParticipationRequest>>;

    /// The non-canceled request of `requester` for `event`, if any
    async fn find_active_request(
        &self,
        requester: i64,
        event: i64,
    ) -> Result<Option<ParticipationRequest>>;

    /// Requests of an event, ordered by id
    async fn list_requests_for_event(&self, event: i64) -> Result<Vec<ParticipationRequest>>;

    /// Requests made by a user, ordered by id
    async fn list_requests_for_requester(&self, requester: i64) -> Result<Vec<ParticipationRequest>>;

    async fn commit_admission(&self, commit: AdmissionCommit) -> Result<Versioned<AdmissionReceipt>>;

    async fn health_check(&self) -> Result<()>;
}
