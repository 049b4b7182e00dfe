//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod directory;
pub mod event;
pub mod request;

// Re-export repositories
pub use directory::DirectoryRepository;
pub use event::EventRepository;
pub use request::RequestRepository;
