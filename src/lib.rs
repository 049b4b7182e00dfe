//! EventHub
//!
//! An event publishing service. Organizers create events, administrators
//! moderate them and users request to join. Participation requests are
//! admitted against each event's capacity with optimistic concurrency, so
//! concurrent requests never oversell an event.

pub mod config;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{EventHubError, Result};

// Re-export main components for easy access
pub use database::{DatabaseService, EventStore, MemoryStore};
pub use handlers::{create_router, AppState};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
