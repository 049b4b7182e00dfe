//! Test context for unified test setup
//!
//! Builds the full service stack over a seeded `MemoryStore` and a
//! `FakeStatsClient`, the same way `main` wires the PostgreSQL backend.

use axum::Router;
use std::sync::Arc;

use eventhub::config::{Settings, StorageBackend};
use eventhub::database::{EventStore, MemoryStore};
use eventhub::handlers::{create_router, AppState};
use eventhub::models::{Event, StateAction};
use eventhub::services::{ServiceFactory, StatsClient};

use super::stats_mock::FakeStatsClient;
use super::test_data::{new_event_request, state_change, test_categories, test_user, SEEDED_USERS};

/// Unified test context that manages all test components
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub stats: Arc<FakeStatsClient>,
    pub services: ServiceFactory,
    pub settings: Settings,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let store = Arc::new(seeded_store());
        let stats = Arc::new(FakeStatsClient::new());
        let services = build_services(&settings, store.clone(), stats.clone());

        Self {
            store,
            stats,
            services,
            settings,
        }
    }

    pub fn router(&self) -> Router {
        create_router(AppState::new(self.services.clone()))
    }

    /// Create a PENDING event owned by `initiator`
    pub async fn create_event(&self, initiator: i64, limit: i32, moderation: bool) -> Event {
        let mut request = new_event_request("Friday Night Swing");
        request.participant_limit = Some(limit);
        request.request_moderation = Some(moderation);

        self.services
            .lifecycle_service
            .create(initiator, request)
            .await
            .expect("event is created")
    }

    pub async fn publish(&self, event_id: i64) -> Event {
        self.services
            .lifecycle_service
            .update_by_admin(event_id, state_change(StateAction::PublishEvent))
            .await
            .expect("event is published")
    }

    /// Create and publish an event owned by `initiator`
    pub async fn published_event(&self, initiator: i64, limit: i32, moderation: bool) -> Event {
        let event = self.create_event(initiator, limit, moderation).await;
        self.publish(event.id).await
    }

    pub async fn event(&self, event_id: i64) -> Event {
        self.store
            .find_event(event_id)
            .await
            .expect("store is readable")
            .expect("event exists")
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.storage.backend = StorageBackend::Memory;
    settings.admission.retry_backoff_ms = 1;
    settings
}

/// A `MemoryStore` holding the seeded users and categories
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    for id in 1..=SEEDED_USERS {
        store.insert_user(test_user(id));
    }
    for category in test_categories() {
        store.insert_category(category);
    }
    store
}

pub fn build_services(
    settings: &Settings,
    store: Arc<dyn EventStore>,
    stats: Arc<dyn StatsClient>,
) -> ServiceFactory {
    ServiceFactory::new(settings, store, stats)
}
