//! Database module
//!
//! This module handles database connections and the event store backends

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, run_migrations, DatabasePool};
pub use memory::MemoryStore;
pub use repositories::{DirectoryRepository, EventRepository, RequestRepository};
pub use service::DatabaseService;
pub use store::{AdmissionCommit, AdmissionReceipt, EventStore, Versioned};
