//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::{Settings, StorageBackend};
use crate::utils::errors::{EventHubError, Result};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    if settings.storage.backend == StorageBackend::Postgres {
        validate_database_config(&settings.database)?;
    }
    validate_stats_config(&settings.stats)?;
    validate_admission_config(&settings.admission)?;
    validate_lifecycle_config(&settings.lifecycle)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate HTTP listener configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(EventHubError::Config("Server host is required".to_string()));
    }

    if config.port == 0 {
        return Err(EventHubError::Config(
            "Server port must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(EventHubError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(EventHubError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(EventHubError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate statistics service configuration
fn validate_stats_config(config: &super::StatsConfig) -> Result<()> {
    if let Err(e) = url::Url::parse(&config.base_url) {
        return Err(EventHubError::Config(format!(
            "Invalid statistics base URL {}: {}",
            config.base_url, e
        )));
    }

    if config.app_name.is_empty() {
        return Err(EventHubError::Config(
            "Statistics app name is required".to_string(),
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(EventHubError::Config(
            "Statistics timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate the counter retry policy
fn validate_admission_config(config: &super::AdmissionConfig) -> Result<()> {
    if config.max_attempts == 0 {
        return Err(EventHubError::Config(
            "Admission max attempts must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Validate event date lead times
fn validate_lifecycle_config(config: &super::LifecycleConfig) -> Result<()> {
    if config.initiator_lead_hours < 0 || config.admin_lead_hours < 0 {
        return Err(EventHubError::Config(
            "Lead times cannot be negative".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EventHubError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EventHubError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_rejects_zero_attempts() {
        let mut settings = Settings::default();
        settings.admission.max_attempts = 0;
        assert_matches!(validate_settings(&settings), Err(EventHubError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_stats_url() {
        let mut settings = Settings::default();
        settings.stats.base_url = "not a url".to_string();
        assert_matches!(validate_settings(&settings), Err(EventHubError::Config(_)));
    }

    #[test]
    fn test_memory_backend_skips_database_checks() {
        let mut settings = Settings::default();
        settings.storage.backend = StorageBackend::Memory;
        settings.database.url.clear();
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        assert_matches!(validate_settings(&settings), Err(EventHubError::Config(_)));
    }
}
