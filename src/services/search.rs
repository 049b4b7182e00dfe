//! Event search
//!
//! Turns a parameter bag into an [`EventQuery`]. Each present parameter adds
//! one predicate; absent, blank or empty parameters add none.

use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::debug;

use super::views::ViewAnnotator;
use crate::database::EventStore;
use crate::models::{
    Event, EventPredicate, EventQuery, EventSearchParameters, EventState, PageRequest,
};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::now;

/// Which search surface a query is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Published events only; initiator and state filters are ignored
    Public,
    Admin,
}

pub fn compile_query(
    params: &EventSearchParameters,
    scope: SearchScope,
    at: NaiveDateTime,
) -> Result<EventQuery> {
    let page = PageRequest::from_offset(params.from, params.size)?;

    if let (Some(start), Some(end)) = (params.range_start, params.range_end) {
        if start > end {
            return Err(EventHubError::validation(
                "rangeStart must not be after rangeEnd",
            ));
        }
    }

    let mut predicates = Vec::new();

    if let Some(text) = params.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        predicates.push(EventPredicate::Text(text.to_string()));
    }
    if let Some(categories) = params.categories.as_ref().filter(|c| !c.is_empty()) {
        predicates.push(EventPredicate::Categories(categories.clone()));
    }
    if let Some(paid) = params.paid {
        predicates.push(EventPredicate::Paid(paid));
    }
    match params.range_start {
        Some(start) => predicates.push(EventPredicate::StartsAtOrAfter(start)),
        None => predicates.push(EventPredicate::StartsAfter(at)),
    }
    if let Some(end) = params.range_end {
        predicates.push(EventPredicate::StartsAtOrBefore(end));
    }
    if params.only_available {
        predicates.push(EventPredicate::OnlyAvailable);
    }

    match scope {
        SearchScope::Public => predicates.push(EventPredicate::States(vec![EventState::Published])),
        SearchScope::Admin => {
            if let Some(users) = params.users.as_ref().filter(|u| !u.is_empty()) {
                predicates.push(EventPredicate::Initiators(users.clone()));
            }
            if let Some(states) = params.states.as_ref().filter(|s| !s.is_empty()) {
                predicates.push(EventPredicate::States(states.clone()));
            }
        }
    }

    Ok(EventQuery {
        predicates,
        sort: params.sort,
        page,
    })
}

#[derive(Clone)]
pub struct SearchService {
    store: Arc<dyn EventStore>,
    views: ViewAnnotator,
}

impl SearchService {
    pub fn new(store: Arc<dyn EventStore>, views: ViewAnnotator) -> Self {
        Self { store, views }
    }

    /// Search published events; results carry fresh view counters
    pub async fn search_public(&self, params: &EventSearchParameters) -> Result<Vec<Event>> {
        let query = compile_query(params, SearchScope::Public, now())?;
        debug!(predicates = query.predicates.len(), "Running public event search");

        let events = self.store.search(&query).await?;
        Ok(self.views.annotate_all(events).await)
    }

    pub async fn search_admin(&self, params: &EventSearchParameters) -> Result<Vec<Event>> {
        let query = compile_query(params, SearchScope::Admin, now())?;
        debug!(predicates = query.predicates.len(), "Running admin event search");

        self.store.search(&query).await
    }
}
