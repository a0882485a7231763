//! Configuration validation.

use super::Config;
use crate::catalog;
use crate::error::{MigrateError, Result};
use crate::target::tls::SslMode;
use crate::target::MAX_BIND_PARAMS;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.path.as_os_str().is_empty() {
        return Err(MigrateError::Config("source.path is required".into()));
    }

    // Target validation
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.port == 0 {
        return Err(MigrateError::Config("target.port must be non-zero".into()));
    }
    if config.target.database.is_empty() {
        return Err(MigrateError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(MigrateError::Config("target.user is required".into()));
    }
    if config.target.schema.is_empty() {
        return Err(MigrateError::Config("target.schema is required".into()));
    }
    SslMode::parse(&config.target.ssl_mode)?;

    // Migration config validation
    if config.migration.extract_chunk_size == 0 {
        return Err(MigrateError::Config(
            "migration.extract_chunk_size must be at least 1".into(),
        ));
    }
    if config.migration.load_chunk_size == 0 {
        return Err(MigrateError::Config(
            "migration.load_chunk_size must be at least 1".into(),
        ));
    }

    // One INSERT binds chunk * width parameters
    let width = catalog::widest_table();
    let max_chunk = MAX_BIND_PARAMS / width;
    if config.migration.load_chunk_size > max_chunk {
        return Err(MigrateError::Config(format!(
            "migration.load_chunk_size must be at most {} ({} columns per row, {} bind parameters per statement)",
            max_chunk, width, MAX_BIND_PARAMS
        )));
    }

    // Logging validation
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(MigrateError::Config(format!(
            "logging.level must be one of {}, got '{}'",
            LOG_LEVELS.join(", "),
            config.logging.level
        )));
    }
    let format = config.logging.format.to_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        return Err(MigrateError::Config(format!(
            "logging.format must be one of {}, got '{}'",
            LOG_FORMATS.join(", "),
            config.logging.format
        )));
    }

    Ok(())
}
