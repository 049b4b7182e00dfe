//! In-process event store
//!
//! Backs the `memory` storage backend and the test suite. Every write runs
//! under a single write lock, so an admission commit is atomic with respect
//! to every other operation on the store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::store::{AdmissionCommit, AdmissionReceipt, EventStore, Versioned};
use crate::models::{
    Category, Event, EventQuery, NewEventRecord, PageRequest, ParticipationRequest, SortMode, User,
};
use crate::utils::errors::{EventHubError, Result};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    events: BTreeMap<i64, Event>,
    requests: BTreeMap<i64, ParticipationRequest>,
    next_event_id: i64,
    next_request_id: i64,
}

impl Tables {
    fn has_active_request(&self, requester: i64, event: i64) -> bool {
        self.requests
            .values()
            .any(|r| r.requester == requester && r.event == event && r.status.is_active())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.tables.write().users.insert(user.id, user);
    }

    pub fn insert_category(&self, category: Category) {
        self.tables.write().categories.insert(category.id, category);
    }

    pub fn event_count(&self) -> usize {
        self.tables.read().events.len()
    }
}

/// Order events the way the PostgreSQL store does: by key, then by id
pub(crate) fn sort_events(events: &mut [Event], sort: Option<SortMode>) {
    match sort {
        Some(SortMode::EventDate) => events.sort_by(|a, b| a.event_date.cmp(&b.event_date).then(a.id.cmp(&b.id))),
        Some(SortMode::Views) => events.sort_by(|a, b| a.views.cmp(&b.views).then(a.id.cmp(&b.id))),
        None => events.sort_by_key(|e| e.id),
    }
}

fn page_of<T>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.size as usize)
        .collect()
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>> {
        Ok(self.tables.read().categories.get(&id).cloned())
    }

    async fn insert_event(&self, record: NewEventRecord) -> Result<Event> {
        let mut tables = self.tables.write();
        tables.next_event_id += 1;
        let event = Event {
            id: tables.next_event_id,
            annotation: record.annotation,
            category: record.category,
            description: record.description,
            event_date: record.event_date,
            location: record.location,
            paid: record.paid,
            participant_limit: record.participant_limit,
            confirmed_requests: 0,
            request_moderation: record.request_moderation,
            title: record.title,
            created_on: record.created_on,
            initiator: record.initiator,
            published_on: None,
            state: record.state,
            views: 0,
            version: 0,
        };
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: i64) -> Result<Option<Event>> {
        Ok(self.tables.read().events.get(&id).cloned())
    }

    async fn list_events_by_initiator(&self, initiator: i64, page: PageRequest) -> Result<Vec<Event>> {
        let events: Vec<Event> = self
            .tables
            .read()
            .events
            .values()
            .filter(|e| e.initiator == initiator)
            .cloned()
            .collect();
        Ok(page_of(events, page))
    }

    async fn save_event(&self, event: &Event) -> Result<Versioned<Event>> {
        let mut tables = self.tables.write();
        let stored = tables
            .events
            .get_mut(&event.id)
            .ok_or_else(|| EventHubError::not_found(format!("Event with id={} was not found", event.id)))?;

        if stored.version != event.version {
            return Ok(Versioned::Stale);
        }

        let mut saved = event.clone();
        saved.confirmed_requests = stored.confirmed_requests;
        saved.views = stored.views;
        saved.version = stored.version + 1;
        *stored = saved.clone();
        Ok(Versioned::Committed(saved))
    }

    async fn search(&self, query: &EventQuery) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .tables
            .read()
            .events
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        sort_events(&mut events, query.sort);
        Ok(page_of(events, query.page))
    }

    async fn record_views(&self, event_id: i64, views: i64) -> Result<()> {
        if let Some(event) = self.tables.write().events.get_mut(&event_id) {
            event.views = views;
        }
        Ok(())
    }

    async fn find_request(&self, id: i64) -> Result<Option<ParticipationRequest>> {
        Ok(self.tables.read().requests.get(&id).cloned())
    }

    async fn find_active_request(
        &self,
        requester: i64,
        event: i64,
    ) -> Result<Option<ParticipationRequest>> {
        Ok(self
            .tables
            .read()
            .requests
            .values()
            .find(|r| r.requester == requester && r.event == event && r.status.is_active())
            .cloned())
    }

    async fn list_requests_for_event(&self, event: i64) -> Result<Vec<ParticipationRequest>> {
        Ok(self
            .tables
            .read()
            .requests
            .values()
            .filter(|r| r.event == event)
            .cloned()
            .collect())
    }

    async fn list_requests_for_requester(&self, requester: i64) -> Result<Vec<ParticipationRequest>> {
        Ok(self
            .tables
            .read()
            .requests
            .values()
            .filter(|r| r.requester == requester)
            .cloned()
            .collect())
    }

    async fn commit_admission(&self, commit: AdmissionCommit) -> Result<Versioned<AdmissionReceipt>> {
        let mut tables = self.tables.write();

        let current_version = tables
            .events
            .get(&commit.event_id)
            .map(|e| e.version)
            .ok_or_else(|| EventHubError::not_found(format!("Event with id={} was not found", commit.event_id)))?;
        if current_version != commit.expected_version {
            return Ok(Versioned::Stale);
        }

        // Validate everything before the first write so a failed commit leaves no trace
        for (id, _) in &commit.status_changes {
            if !tables.requests.contains_key(id) {
                return Err(EventHubError::not_found(format!("Request with id={} was not found", id)));
            }
        }
        for insert in &commit.inserts {
            if insert.status.is_active() && tables.has_active_request(insert.requester, insert.event) {
                return Err(EventHubError::conflict(format!(
                    "User {} already has a request for event {}",
                    insert.requester, insert.event
                )));
            }
        }

        let mut inserted = Vec::with_capacity(commit.inserts.len());
        for insert in commit.inserts {
            tables.next_request_id += 1;
            let request = ParticipationRequest {
                id: tables.next_request_id,
                created: insert.created,
                event: insert.event,
                requester: insert.requester,
                status: insert.status,
            };
            tables.requests.insert(request.id, request.clone());
            inserted.push(request);
        }

        let mut updated = Vec::with_capacity(commit.status_changes.len());
        for (id, status) in commit.status_changes {
            if let Some(request) = tables.requests.get_mut(&id) {
                request.status = status;
                updated.push(request.clone());
            }
        }

        let event = match tables.events.get_mut(&commit.event_id) {
            Some(event) => {
                event.confirmed_requests = commit.confirmed_requests;
                event.version += 1;
                event.clone()
            }
            None => return Err(EventHubError::not_found(format!("Event with id={} was not found", commit.event_id))),
        };

        Ok(Versioned::Committed(AdmissionReceipt {
            event,
            inserted,
            updated,
        }))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
