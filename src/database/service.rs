//! Database service layer
//!
//! PostgreSQL implementation of [`EventStore`] built from the repositories.

use async_trait::async_trait;
use std::time::Instant;

use crate::database::connection::{self, DatabasePool};
use crate::database::repositories::{DirectoryRepository, EventRepository, RequestRepository};
use crate::database::store::{AdmissionCommit, AdmissionReceipt, EventStore, Versioned};
use crate::models::*;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::log_database_operation;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub directory: DirectoryRepository,
    pub events: EventRepository,
    pub requests: RequestRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            directory: DirectoryRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            requests: RequestRepository::new(pool.clone()),
            pool,
        }
    }
}

/// The partial unique index on active requests surfaces as a conflict
fn map_unique_violation(error: EventHubError, requester: i64, event: i64) -> EventHubError {
    match error {
        EventHubError::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
            EventHubError::conflict(format!(
                "User {} already has a request for event {}",
                requester, event
            ))
        }
        other => other,
    }
}

#[async_trait]
impl EventStore for DatabaseService {
    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        self.directory.find_user(id).await
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>> {
        self.directory.find_category(id).await
    }

    async fn insert_event(&self, record: NewEventRecord) -> Result<Event> {
        self.events.create(record).await
    }

    async fn find_event(&self, id: i64) -> Result<Option<Event>> {
        self.events.find_by_id(id).await
    }

    async fn list_events_by_initiator(&self, initiator: i64, page: PageRequest) -> Result<Vec<Event>> {
        self.events.list_by_initiator(initiator, page).await
    }

    async fn save_event(&self, event: &Event) -> Result<Versioned<Event>> {
        match self.events.update_versioned(event).await? {
            Some(saved) => Ok(Versioned::Committed(saved)),
            None => {
                if self.events.find_by_id(event.id).await?.is_none() {
                    return Err(EventHubError::not_found(format!(
                        "Event with id={} was not found",
                        event.id
                    )));
                }
                Ok(Versioned::Stale)
            }
        }
    }

    async fn search(&self, query: &EventQuery) -> Result<Vec<Event>> {
        self.events.search(query).await
    }

    async fn record_views(&self, event_id: i64, views: i64) -> Result<()> {
        self.events.set_views(event_id, views).await
    }

    async fn find_request(&self, id: i64) -> Result<Option<ParticipationRequest>> {
        self.requests.find_by_id(id).await
    }

    async fn find_active_request(
        &self,
        requester: i64,
        event: i64,
    ) -> Result<Option<ParticipationRequest>> {
        self.requests.find_active(requester, event).await
    }

    async fn list_requests_for_event(&self, event: i64) -> Result<Vec<ParticipationRequest>> {
        self.requests.list_by_event(event).await
    }

    async fn list_requests_for_requester(&self, requester: i64) -> Result<Vec<ParticipationRequest>> {
        self.requests.list_by_requester(requester).await
    }

    async fn commit_admission(&self, commit: AdmissionCommit) -> Result<Versioned<AdmissionReceipt>> {
        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        // The row lock serializes concurrent commits for the same event
        let version = EventRepository::lock_version(&mut *tx, commit.event_id)
            .await?
            .ok_or_else(|| {
                EventHubError::not_found(format!("Event with id={} was not found", commit.event_id))
            })?;
        if version != commit.expected_version {
            tx.rollback().await?;
            return Ok(Versioned::Stale);
        }

        let mut updated = Vec::with_capacity(commit.status_changes.len());
        for (id, status) in &commit.status_changes {
            let request = RequestRepository::update_status(&mut *tx, *id, *status)
                .await?
                .ok_or_else(|| EventHubError::not_found(format!("Request with id={} was not found", id)))?;
            updated.push(request);
        }

        let mut inserted = Vec::with_capacity(commit.inserts.len());
        for insert in &commit.inserts {
            let request = RequestRepository::insert(&mut *tx, insert)
                .await
                .map_err(|e| map_unique_violation(e, insert.requester, insert.event))?;
            inserted.push(request);
        }

        let event = match EventRepository::set_confirmed_requests(
            &mut *tx,
            commit.event_id,
            commit.expected_version,
            commit.confirmed_requests,
        )
        .await?
        {
            Some(event) => event,
            None => {
                tx.rollback().await?;
                return Ok(Versioned::Stale);
            }
        };

        tx.commit().await?;
        log_database_operation(
            "commit_admission",
            "events",
            started.elapsed().as_millis() as u64,
            true,
        );

        Ok(Versioned::Committed(AdmissionReceipt {
            event,
            inserted,
            updated,
        }))
    }

    async fn health_check(&self) -> Result<()> {
        connection::health_check(&self.pool).await
    }
}
