//! Test helpers module
//!
//! Shared setup for the integration tests: an in-memory service stack, a
//! scripted statistics client, a mock statistics server and an optional
//! PostgreSQL database.

#![allow(dead_code, unused_imports)]

pub mod database_helper;
pub mod stats_mock;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use stats_mock::*;
pub use test_context::*;
pub use test_data::*;
