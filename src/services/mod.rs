//! Services module
//!
//! This module contains business logic services

pub mod admission;
pub mod lifecycle;
pub mod retry;
pub mod search;
pub mod stats;
pub mod views;

// Re-export commonly used services
pub use admission::AdmissionService;
pub use lifecycle::{apply_transition, find_transition, LifecycleService, Transition, TRANSITIONS};
pub use retry::RetryPolicy;
pub use search::{compile_query, SearchScope, SearchService};
pub use stats::{EndpointHit, HttpStatsClient, StatsClient, ViewStats};
pub use views::ViewAnnotator;

use std::sync::Arc;

use crate::config::settings::Settings;
use crate::database::EventStore;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub lifecycle_service: LifecycleService,
    pub admission_service: AdmissionService,
    pub search_service: SearchService,
    pub view_annotator: ViewAnnotator,
    store: Arc<dyn EventStore>,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services sharing one store
    pub fn new(settings: &Settings, store: Arc<dyn EventStore>, stats: Arc<dyn StatsClient>) -> Self {
        let retry = RetryPolicy::from_config(&settings.admission);
        let view_annotator = ViewAnnotator::new(stats, Arc::clone(&store), settings.stats.app_name.clone());

        let lifecycle_service = LifecycleService::new(
            Arc::clone(&store),
            view_annotator.clone(),
            retry,
            &settings.lifecycle,
        );
        let admission_service = AdmissionService::new(Arc::clone(&store), retry);
        let search_service = SearchService::new(Arc::clone(&store), view_annotator.clone());

        Self {
            lifecycle_service,
            admission_service,
            search_service,
            view_annotator,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let store_error = self.store.health_check().await.err().map(|e| e.to_string());

        ServiceHealthStatus {
            store_healthy: store_error.is_none(),
            store_error,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceHealthStatus {
    pub store_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.store_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if let Some(error) = &self.store_error {
            issues.push(format!("Event store unavailable: {}", error));
        }

        issues
    }
}
