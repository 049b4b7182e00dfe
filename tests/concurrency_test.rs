//! Optimistic retry tests
//!
//! `RacingStore` slips a competing admission in between a service's read and
//! its commit, so the stale-commit path runs deterministically.

mod helpers;

use assert_matches::assert_matches;
use async_trait::async_trait;
use helpers::*;
use serial_test::serial;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

use eventhub::database::{AdmissionCommit, AdmissionReceipt, EventStore, MemoryStore, Versioned};
use eventhub::models::{
    Category, Event, EventQuery, NewEventRecord, NewParticipationRequest, PageRequest,
    ParticipationRequest, RequestStatus, User,
};
use eventhub::services::ServiceFactory;
use eventhub::utils::helpers::now;
use eventhub::{EventHubError, Result};

struct RacingStore {
    inner: MemoryStore,
    races_left: AtomicU32,
    next_intruder: AtomicI64,
}

impl RacingStore {
    fn new(races: u32) -> Self {
        Self {
            inner: seeded_store(),
            races_left: AtomicU32::new(races),
            next_intruder: AtomicI64::new(20),
        }
    }

    /// Confirm a request from another user on the same event
    async fn intrude(&self, event_id: i64) -> Result<()> {
        let event = self
            .inner
            .find_event(event_id)
            .await?
            .ok_or_else(|| EventHubError::not_found("event vanished"))?;

        let mut commit = AdmissionCommit::new(&event);
        commit.confirmed_requests += 1;
        commit.inserts.push(NewParticipationRequest {
            requester: self.next_intruder.fetch_add(1, Ordering::SeqCst),
            event: event_id,
            created: now(),
            status: RequestStatus::Confirmed,
        });
        self.inner.commit_admission(commit).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for RacingStore {
    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>> {
        self.inner.find_category(id).await
    }

    async fn insert_event(&self, record: NewEventRecord) -> Result<Event> {
        self.inner.insert_event(record).await
    }

    async fn find_event(&self, id: i64) -> Result<Option<Event>> {
        self.inner.find_event(id).await
    }

    async fn list_events_by_initiator(&self, initiator: i64, page: PageRequest) -> Result<Vec<Event>> {
        self.inner.list_events_by_initiator(initiator, page).await
    }

    async fn save_event(&self, event: &Event) -> Result<Versioned<Event>> {
        self.inner.save_event(event).await
    }

    async fn search(&self, query: &EventQuery) -> Result<Vec<Event>> {
        self.inner.search(query).await
    }

    async fn record_views(&self, event_id: i64, views: i64) -> Result<()> {
        self.inner.record_views(event_id, views).await
    }

    async fn find_request(&self, id: i64) -> Result<Option<ParticipationRequest>> {
        self.inner.find_request(id).await
    }

    async fn find_active_request(
        &self,
        requester: i64,
        event: i64,
    ) -> Result<Option<ParticipationRequest>> {
        self.inner.find_active_request(requester, event).await
    }

    async fn list_requests_for_event(&self, event: i64) -> Result<Vec<ParticipationRequest>> {
        self.inner.list_requests_for_event(event).await
    }

    async fn list_requests_for_requester(&self, requester: i64) -> Result<Vec<ParticipationRequest>> {
        self.inner.list_requests_for_requester(requester).await
    }

    async fn commit_admission(&self, commit: AdmissionCommit) -> Result<Versioned<AdmissionReceipt>> {
        let race = self
            .races_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if race {
            self.intrude(commit.event_id).await?;
        }
        self.inner.commit_admission(commit).await
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }
}

struct RacingContext {
    store: Arc<RacingStore>,
    services: ServiceFactory,
}

async fn racing_context(races: u32, limit: i32, moderation: bool) -> (RacingContext, Event) {
    let store = Arc::new(RacingStore::new(races));
    let services = build_services(&test_settings(), store.clone(), Arc::new(FakeStatsClient::new()));

    let mut request = new_event_request("Lindy Exchange");
    request.participant_limit = Some(limit);
    request.request_moderation = Some(moderation);
    let event = services.lifecycle_service.create(INITIATOR_ID, request).await.unwrap();
    let event = services
        .lifecycle_service
        .update_by_admin(event.id, state_change(eventhub::models::StateAction::PublishEvent))
        .await
        .unwrap();

    (RacingContext { store, services }, event)
}

impl RacingContext {
    async fn confirmed(&self, event_id: i64) -> i32 {
        self.store.find_event(event_id).await.unwrap().unwrap().confirmed_requests
    }
}

#[tokio::test]
#[serial]
async fn test_stale_submit_rechecks_capacity() {
    let (ctx, event) = racing_context(1, 1, false).await;

    // The competing admission takes the last seat before our commit lands
    let result = ctx.services.admission_service.submit(2, event.id).await;

    assert_matches!(result, Err(EventHubError::Conflict(message)) if message.contains("limit"));
    assert_eq!(ctx.confirmed(event.id).await, 1);
    assert!(ctx.store.find_active_request(2, event.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_stale_submit_succeeds_on_retry() {
    let (ctx, event) = racing_context(1, 2, false).await;

    let request = ctx.services.admission_service.submit(2, event.id).await.unwrap();

    assert_eq!(request.status, RequestStatus::Confirmed);
    assert_eq!(ctx.confirmed(event.id).await, 2);
}

#[tokio::test]
#[serial]
async fn test_retries_are_bounded() {
    let (ctx, event) = racing_context(u32::MAX, 0, false).await;

    let result = ctx.services.admission_service.submit(2, event.id).await;

    assert_matches!(result, Err(EventHubError::Conflict(message)) if message == "capacity changed, retry");
    let attempts = test_settings().admission.max_attempts as i32;
    assert_eq!(ctx.confirmed(event.id).await, attempts);
}

#[tokio::test]
#[serial]
async fn test_stale_batch_is_recomputed() {
    let (ctx, event) = racing_context(0, 3, true).await;
    let admission = &ctx.services.admission_service;

    let a = admission.submit(2, event.id).await.unwrap();
    let b = admission.submit(3, event.id).await.unwrap();

    // One seat disappears between the batch's read and its commit
    ctx.store.races_left.store(1, Ordering::SeqCst);
    let result = admission
        .resolve_batch(INITIATOR_ID, event.id, status_update(&[a.id, b.id], RequestStatus::Confirmed))
        .await
        .unwrap();

    assert_eq!(result.confirmed_requests.len(), 2);
    assert_eq!(ctx.confirmed(event.id).await, 3);

    let requests = admission.list_for_event(INITIATOR_ID, event.id).await.unwrap();
    let confirmed = requests.iter().filter(|r| r.status == RequestStatus::Confirmed).count();
    assert_eq!(confirmed, 3);
}
