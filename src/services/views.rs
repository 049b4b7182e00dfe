//! View counter annotation
//!
//! Views are owned by the statistics service. Reads ask it for unique hits
//! and stamp the answer onto the event; a statistics outage never fails the
//! read, the last stored value is served instead.

use chrono::Duration;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::stats::{EndpointHit, StatsClient};
use crate::database::EventStore;
use crate::models::Event;
use crate::utils::helpers::now;
use crate::utils::logging::log_api_error;

#[derive(Clone)]
pub struct ViewAnnotator {
    stats: Arc<dyn StatsClient>,
    store: Arc<dyn EventStore>,
    app_name: String,
}

impl ViewAnnotator {
    pub fn new(stats: Arc<dyn StatsClient>, store: Arc<dyn EventStore>, app_name: impl Into<String>) -> Self {
        Self {
            stats,
            store,
            app_name: app_name.into(),
        }
    }

    /// Stamp the current unique-hit count onto `event`
    pub async fn annotate(&self, mut event: Event) -> Event {
        self.stamp(std::slice::from_mut(&mut event)).await;
        event
    }

    pub async fn annotate_all(&self, mut events: Vec<Event>) -> Vec<Event> {
        self.stamp(&mut events).await;
        events
    }

    /// One statistics query covers the whole page
    async fn stamp(&self, events: &mut [Event]) {
        if events.is_empty() {
            return;
        }

        let now = now();
        let uris: Vec<String> = events.iter().map(Event::uri).collect();

        let stats = match self
            .stats
            .query_hits(now - Duration::days(365), now + Duration::days(1), &uris, true)
            .await
        {
            Ok(stats) => stats,
            Err(e) => {
                log_api_error("stats", &e.to_string(), Some(&uris.join(",")));
                warn!(count = events.len(), "Failed to fetch views, keeping stored values");
                return;
            }
        };

        let hits: HashMap<&str, i64> = stats
            .iter()
            .map(|entry| (entry.uri.as_str(), entry.hits))
            .collect();

        let updates = events.iter_mut().zip(&uris).map(|(event, uri)| {
            // No entry means nobody has viewed the event yet
            event.views = hits.get(uri.as_str()).copied().unwrap_or(0);
            let (event_id, views) = (event.id, event.views);
            async move {
                if let Err(e) = self.store.record_views(event_id, views).await {
                    warn!(event_id, error = %e, "Failed to store views");
                }
            }
        });
        join_all(updates).await;
    }

    /// Report a hit without waiting for the statistics service
    pub fn record_hit(&self, uri: String, ip: String) {
        let stats = Arc::clone(&self.stats);
        let hit = EndpointHit {
            app: self.app_name.clone(),
            uri,
            ip,
            timestamp: now(),
        };
        tokio::spawn(async move {
            if let Err(e) = stats.record_hit(&hit).await {
                warn!(uri = %hit.uri, error = %e, "Failed to record hit");
            }
        });
    }
}
