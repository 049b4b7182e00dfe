//! Event lifecycle service
//!
//! Owns event creation and every change to an event's content or state.
//! State changes go through a single transition table keyed by the acting
//! role and the requested action.

use chrono::{Duration, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, info};

use super::retry::RetryPolicy;
use super::views::ViewAnnotator;
use crate::config::LifecycleConfig;
use crate::database::{EventStore, Versioned};
use crate::models::{
    ActorRole, Event, EventState, NewEventRecord, NewEventRequest, PageRequest, StateAction,
    UpdateEventRequest,
};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{format_timestamp, now, truncate_text};
use crate::utils::logging::{log_admin_action, log_event_action};

/// One row of the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub role: ActorRole,
    pub action: StateAction,
    pub from: &'static [EventState],
    pub next: EventState,
    /// Stamp `published_on`
    pub publishes: bool,
}

pub const TRANSITIONS: &[Transition] = &[
    Transition {
        role: ActorRole::Initiator,
        action: StateAction::SendToReview,
        from: &[EventState::Pending, EventState::Canceled],
        next: EventState::Pending,
        publishes: false,
    },
    Transition {
        role: ActorRole::Initiator,
        action: StateAction::CancelReview,
        from: &[EventState::Pending, EventState::Canceled],
        next: EventState::Canceled,
        publishes: false,
    },
    Transition {
        role: ActorRole::Admin,
        action: StateAction::PublishEvent,
        from: &[EventState::Pending],
        next: EventState::Published,
        publishes: true,
    },
    Transition {
        role: ActorRole::Admin,
        action: StateAction::RejectEvent,
        from: &[EventState::Pending, EventState::Canceled],
        next: EventState::Canceled,
        publishes: false,
    },
    Transition {
        role: ActorRole::Admin,
        action: StateAction::CancelReview,
        from: &[EventState::Pending, EventState::Canceled],
        next: EventState::Canceled,
        publishes: false,
    },
];

pub fn find_transition(role: ActorRole, action: StateAction) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.role == role && t.action == action)
}

/// Move `event` along the transition table
pub fn apply_transition(
    event: &mut Event,
    role: ActorRole,
    action: StateAction,
    at: NaiveDateTime,
) -> Result<()> {
    let transition = find_transition(role, action).ok_or_else(|| {
        EventHubError::validation(format!("Action {} is not available to the {}", action, role))
    })?;

    if !transition.from.contains(&event.state) {
        return Err(match action {
            StateAction::PublishEvent => EventHubError::conflict(format!(
                "Cannot publish the event because it's not in the right state: {}. The event must be pending review",
                event.state
            )),
            _ => EventHubError::conflict(format!(
                "Cannot apply {} to an event in state {}",
                action, event.state
            )),
        });
    }

    event.state = transition.next;
    if transition.publishes {
        event.published_on = Some(at);
    }
    Ok(())
}

#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn EventStore>,
    views: ViewAnnotator,
    retry: RetryPolicy,
    initiator_lead: Duration,
    admin_lead: Duration,
}

impl LifecycleService {
    pub fn new(
        store: Arc<dyn EventStore>,
        views: ViewAnnotator,
        retry: RetryPolicy,
        config: &LifecycleConfig,
    ) -> Self {
        Self {
            store,
            views,
            retry,
            initiator_lead: Duration::hours(config.initiator_lead_hours),
            admin_lead: Duration::hours(config.admin_lead_hours),
        }
    }

    /// Create a new event in PENDING on behalf of `user_id`
    pub async fn create(&self, user_id: i64, request: NewEventRequest) -> Result<Event> {
        debug!(user_id = user_id, "Creating event");

        self.require_user(user_id).await?;
        self.require_category(request.category).await?;
        self.check_initiator_date(request.event_date, now())?;

        let record = NewEventRecord {
            annotation: request.annotation,
            category: request.category,
            description: request.description,
            event_date: request.event_date,
            location: request.location,
            paid: request.paid.unwrap_or(false),
            participant_limit: request.participant_limit.unwrap_or(0),
            request_moderation: request.request_moderation.unwrap_or(true),
            title: request.title,
            created_on: now(),
            initiator: user_id,
            state: EventState::Pending,
        };

        let event = self.store.insert_event(record).await?;
        log_event_action(event.id, "created", user_id, Some(&truncate_text(&event.title, 40)));
        Ok(event)
    }

    pub async fn list_for_initiator(&self, user_id: i64, from: i64, size: i64) -> Result<Vec<Event>> {
        let page = PageRequest::from_offset(from, size)?;
        self.require_user(user_id).await?;
        self.store.list_events_by_initiator(user_id, page).await
    }

    pub async fn get_for_initiator(&self, user_id: i64, event_id: i64) -> Result<Event> {
        let event = self.require_event(event_id).await?;
        if event.initiator != user_id {
            return Err(EventHubError::not_found(format!(
                "Event with id={} was not found",
                event_id
            )));
        }
        Ok(event)
    }

    /// Published event for the public API, with its view counter refreshed
    pub async fn get_published(&self, event_id: i64) -> Result<Event> {
        let event = self
            .store
            .find_event(event_id)
            .await?
            .filter(|e| e.state == EventState::Published)
            .ok_or_else(|| {
                EventHubError::not_found(format!("Event with id={} was not found", event_id))
            })?;

        Ok(self.views.annotate(event).await)
    }

    pub async fn update_by_initiator(
        &self,
        user_id: i64,
        event_id: i64,
        update: UpdateEventRequest,
    ) -> Result<Event> {
        self.require_user(user_id).await?;
        if let Some(category) = update.category {
            self.require_category(category).await?;
        }

        let update = &update;
        let event = self
            .retry
            .run("update_by_initiator", move || {
                self.try_update(ActorRole::Initiator, Some(user_id), event_id, update)
            })
            .await?;

        if let Some(action) = update.state_action {
            log_event_action(event.id, action.as_str(), user_id, Some(event.state.as_str()));
        } else {
            log_event_action(event.id, "edited", user_id, None);
        }
        Ok(event)
    }

    pub async fn update_by_admin(&self, event_id: i64, update: UpdateEventRequest) -> Result<Event> {
        if let Some(category) = update.category {
            self.require_category(category).await?;
        }

        let update = &update;
        let event = self
            .retry
            .run("update_by_admin", move || {
                self.try_update(ActorRole::Admin, None, event_id, update)
            })
            .await?;

        let action = update.state_action.map(|a| a.as_str()).unwrap_or("edited");
        log_admin_action(action, event.id, Some(event.state.as_str()));
        Ok(event)
    }

    /// One read-check-save round of an update
    async fn try_update(
        &self,
        role: ActorRole,
        user_id: Option<i64>,
        event_id: i64,
        update: &UpdateEventRequest,
    ) -> Result<Versioned<Event>> {
        let mut event = self.require_event(event_id).await?;
        let at = now();

        match role {
            ActorRole::Initiator => {
                if user_id != Some(event.initiator) {
                    return Err(EventHubError::conflict(format!(
                        "User {} is not the initiator of event {}",
                        user_id.unwrap_or_default(),
                        event_id
                    )));
                }
                if !event.state.is_editable() {
                    return Err(EventHubError::conflict(
                        "Only pending or canceled events can be changed",
                    ));
                }
                self.check_initiator_date(update.event_date.unwrap_or(event.event_date), at)?;
            }
            ActorRole::Admin => {
                if update.has_field_changes() && !event.state.is_editable() {
                    return Err(EventHubError::conflict(
                        "Only pending or canceled events can be changed",
                    ));
                }
                if event.event_date < at + self.admin_lead {
                    return Err(EventHubError::validation(format!(
                        "Event date {} must be at least {} hour(s) from now",
                        format_timestamp(event.event_date),
                        self.admin_lead.num_hours()
                    )));
                }
            }
        }

        if let Some(limit) = update.participant_limit {
            if limit > 0 && limit < event.confirmed_requests {
                return Err(EventHubError::conflict(format!(
                    "Participant limit {} is below the {} already confirmed",
                    limit, event.confirmed_requests
                )));
            }
        }

        event.apply_update(update);
        if let Some(action) = update.state_action {
            apply_transition(&mut event, role, action, at)?;
        }

        let saved = self.store.save_event(&event).await?;
        if let Versioned::Committed(ref saved) = saved {
            info!(event_id = saved.id, state = %saved.state, role = %role, "Event updated");
        }
        Ok(saved)
    }

    fn check_initiator_date(&self, event_date: NaiveDateTime, at: NaiveDateTime) -> Result<()> {
        if event_date < at + self.initiator_lead {
            return Err(EventHubError::validation(format!(
                "Field: eventDate. Error: must be at least {} hour(s) from now. Value: {}",
                self.initiator_lead.num_hours(),
                format_timestamp(event_date)
            )));
        }
        Ok(())
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

    async fn require_category(&self, category_id: i64) -> Result<()> {
        self.store
            .find_category(category_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| {
                EventHubError::not_found(format!("Category with id={} was not found", category_id))
            })
    }
}
