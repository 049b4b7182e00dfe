//! Admission control for participation requests
//!
//! Every decision that changes an event's confirmed counter is computed from
//! a snapshot of the event and committed together with the affected requests
//! through [`EventStore::commit_admission`]. A commit against a stale snapshot
//! is retried from a fresh read.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use super::retry::RetryPolicy;
use crate::database::{AdmissionCommit, EventStore, Versioned};
use crate::models::{
    Event, EventState, NewParticipationRequest, ParticipationRequest, RequestStatus,
    StatusUpdateRequest, StatusUpdateResult,
};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::now;
use crate::utils::logging::log_admission_decision;

#[derive(Clone)]
pub struct AdmissionService {
    store: Arc<dyn EventStore>,
    retry: RetryPolicy,
}

impl AdmissionService {
    pub fn new(store: Arc<dyn EventStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Ask to join a published event
    pub async fn submit(&self, requester_id: i64, event_id: i64) -> Result<ParticipationRequest> {
        debug!(requester_id = requester_id, event_id = event_id, "Submitting participation request");
        self.require_user(requester_id).await?;

        let (request, event) = self
            .retry
            .run("submit", move || self.try_submit(requester_id, event_id))
            .await?;

        log_admission_decision(
            event.id,
            requester_id,
            request.id,
            request.status.as_str(),
            event.confirmed_requests,
        );
        Ok(request)
    }

    async fn try_submit(
        &self,
        requester_id: i64,
        event_id: i64,
    ) -> Result<Versioned<(ParticipationRequest, Event)>> {
        let event = self.require_event(event_id).await?;

        if self.store.find_active_request(requester_id, event_id).await?.is_some() {
            return Err(EventHubError::conflict(format!(
                "User {} already has a request for event {}",
                requester_id, event_id
            )));
        }
        if event.initiator == requester_id {
            return Err(EventHubError::conflict(
                "The initiator cannot request participation in their own event",
            ));
        }
        if event.state != EventState::Published {
            return Err(EventHubError::conflict(
                "Cannot participate in an unpublished event",
            ));
        }
        if event.is_full() {
            return Err(EventHubError::conflict("The participant limit has been reached"));
        }

        let status = if event.auto_confirms() {
            RequestStatus::Confirmed
        } else {
            RequestStatus::Pending
        };

        let mut commit = AdmissionCommit::new(&event);
        if status == RequestStatus::Confirmed {
            commit.confirmed_requests += 1;
        }
        commit.inserts.push(NewParticipationRequest {
            requester: requester_id,
            event: event_id,
            created: now(),
            status,
        });

        match self.store.commit_admission(commit).await? {
            Versioned::Committed(receipt) => {
                let request = receipt.inserted.into_iter().next().ok_or_else(|| {
                    EventHubError::Internal("admission commit returned no request".to_string())
                })?;
                Ok(Versioned::Committed((request, receipt.event)))
            }
            Versioned::Stale => Ok(Versioned::Stale),
        }
    }

    /// Withdraw one's own request
    pub async fn cancel(&self, requester_id: i64, request_id: i64) -> Result<ParticipationRequest> {
        self.require_user(requester_id).await?;

        let (request, event) = self
            .retry
            .run("cancel", move || self.try_cancel(requester_id, request_id))
            .await?;

        log_admission_decision(
            event.id,
            requester_id,
            request.id,
            request.status.as_str(),
            event.confirmed_requests,
        );
        Ok(request)
    }

    async fn try_cancel(
        &self,
        requester_id: i64,
        request_id: i64,
    ) -> Result<Versioned<(ParticipationRequest, Event)>> {
        let request = self
            .store
            .find_request(request_id)
            .await?
            .filter(|r| r.requester == requester_id)
            .ok_or_else(|| {
                EventHubError::not_found(format!("Request with id={} was not found", request_id))
            })?;

        if !matches!(request.status, RequestStatus::Pending | RequestStatus::Confirmed) {
            return Err(EventHubError::conflict(format!(
                "Request with id={} cannot be canceled in status {}",
                request_id, request.status
            )));
        }

        let event = self.require_event(request.event).await?;
        let mut commit = AdmissionCommit::new(&event);
        if request.status == RequestStatus::Confirmed {
            commit.confirmed_requests = (event.confirmed_requests - 1).max(0);
        }
        commit.status_changes.push((request.id, RequestStatus::Canceled));

        match self.store.commit_admission(commit).await? {
            Versioned::Committed(receipt) => {
                let request = receipt.updated.into_iter().next().ok_or_else(|| {
                    EventHubError::Internal("admission commit returned no request".to_string())
                })?;
                Ok(Versioned::Committed((request, receipt.event)))
            }
            Versioned::Stale => Ok(Versioned::Stale),
        }
    }

    /// Requests of an event, as seen by its initiator
    pub async fn list_for_event(&self, initiator_id: i64, event_id: i64) -> Result<Vec<ParticipationRequest>> {
        self.require_user(initiator_id).await?;
        let event = self.require_event(event_id).await?;
        require_initiator(&event, initiator_id)?;

        self.store.list_requests_for_event(event_id).await
    }

    /// Requests made by a user
    pub async fn list_for_requester(&self, requester_id: i64) -> Result<Vec<ParticipationRequest>> {
        self.require_user(requester_id).await?;
        self.store.list_requests_for_requester(requester_id).await
    }

    /// Confirm or reject a batch of pending requests.
    ///
    /// Confirmation fills the remaining capacity in ascending id order and
    /// rejects whatever does not fit.
    pub async fn resolve_batch(
        &self,
        initiator_id: i64,
        event_id: i64,
        update: StatusUpdateRequest,
    ) -> Result<StatusUpdateResult> {
        if !matches!(update.status, RequestStatus::Confirmed | RequestStatus::Rejected) {
            return Err(EventHubError::validation(format!(
                "Requests can only be CONFIRMED or REJECTED, got {}",
                update.status
            )));
        }
        self.require_user(initiator_id).await?;

        let ids: BTreeSet<i64> = update.request_ids.iter().copied().collect();
        let desired = update.status;
        let ids = &ids;

        let result = self
            .retry
            .run("resolve_batch", move || {
                self.try_resolve(initiator_id, event_id, desired, ids)
            })
            .await?;

        info!(
            event_id = event_id,
            initiator_id = initiator_id,
            confirmed = result.confirmed_requests.len(),
            rejected = result.rejected_requests.len(),
            "Participation requests resolved"
        );
        Ok(result)
    }

    async fn try_resolve(
        &self,
        initiator_id: i64,
        event_id: i64,
        desired: RequestStatus,
        ids: &BTreeSet<i64>,
    ) -> Result<Versioned<StatusUpdateResult>> {
        let event = self.require_event(event_id).await?;
        require_initiator(&event, initiator_id)?;

        if ids.is_empty() {
            return Ok(Versioned::Committed(StatusUpdateResult::default()));
        }

        let requests: HashMap<i64, ParticipationRequest> = self
            .store
            .list_requests_for_event(event_id)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        for id in ids {
            let request = requests.get(id).ok_or_else(|| {
                EventHubError::not_found(format!(
                    "Request with id={} was not found for event {}",
                    id, event_id
                ))
            })?;
            if request.status != RequestStatus::Pending {
                return Err(EventHubError::conflict(format!(
                    "Request with id={} must have status PENDING, but has {}",
                    id, request.status
                )));
            }
        }

        if desired == RequestStatus::Confirmed && event.is_full() {
            return Err(EventHubError::conflict("The participant limit has been reached"));
        }

        let mut commit = AdmissionCommit::new(&event);
        let mut seats = event.remaining_capacity();
        for id in ids {
            let fits = seats.map_or(true, |left| left > 0);
            let status = if desired == RequestStatus::Confirmed && fits {
                commit.confirmed_requests += 1;
                if let Some(left) = seats.as_mut() {
                    *left -= 1;
                }
                RequestStatus::Confirmed
            } else {
                RequestStatus::Rejected
            };
            commit.status_changes.push((*id, status));
        }

        match self.store.commit_admission(commit).await? {
            Versioned::Committed(receipt) => {
                let (confirmed_requests, rejected_requests) = receipt
                    .updated
                    .into_iter()
                    .partition(|r| r.status == RequestStatus::Confirmed);
                Ok(Versioned::Committed(StatusUpdateResult {
                    confirmed_requests,
                    rejected_requests,
                }))
            }
            Versioned::Stale => Ok(Versioned::Stale),
        }
    }

    async fn require_event(&self, event_id: i64) -> Result<Event> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or_else(|| EventHubError::not_found(format!("Event with id={} was not found", event_id)))
    }

    async fn require_user(&self, user_id: i64) -> Result<()> {
        self.store
            .find_user(user_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| EventHubError::not_found(format!("User with id={} was not found", user_id)))
    }
}

fn require_initiator(event: &Event, user_id: i64) -> Result<()> {
    if event.initiator != user_id {
        return Err(EventHubError::conflict(format!(
            "User {} is not the initiator of event {}",
            user_id, event.id
        )));
    }
    Ok(())
}
