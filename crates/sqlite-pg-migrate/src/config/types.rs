//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (SQLite file).
    pub source: SourceConfig,

    /// Target database configuration (PostgreSQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Source database (SQLite) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Target database (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Schema holding the catalog tables (default: "content").
    #[serde(default = "default_content_schema")]
    pub schema: String,

    /// SSL mode (default: "disable").
    #[serde(default = "default_disable")]
    pub ssl_mode: String,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Rows fetched from SQLite per page (default: 50).
    #[serde(default = "default_chunk_size")]
    pub extract_chunk_size: usize,

    /// Rows written to PostgreSQL per INSERT statement (default: 50).
    #[serde(default = "default_chunk_size")]
    pub load_chunk_size: usize,

    /// Read every table back from both databases after loading (default: false).
    #[serde(default)]
    pub verify: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            extract_chunk_size: DEFAULT_EXTRACT_CHUNK_SIZE,
            load_chunk_size: DEFAULT_LOAD_CHUNK_SIZE,
            verify: false,
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Verbosity: trace, debug, info, warn, error (default: debug).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: text or json (default: text).
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Default page size for SQLite reads.
pub const DEFAULT_EXTRACT_CHUNK_SIZE: usize = 50;

/// Default batch size for PostgreSQL inserts.
pub const DEFAULT_LOAD_CHUNK_SIZE: usize = 50;

// Default value functions for serde
pub(crate) fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub(crate) fn default_pg_port() -> u16 {
    5432
}

pub(crate) fn default_content_schema() -> String {
    "content".to_string()
}

pub(crate) fn default_disable() -> String {
    "disable".to_string()
}

fn default_chunk_size() -> usize {
    50
}

pub(crate) fn default_log_level() -> String {
    "debug".to_string()
}

pub(crate) fn default_log_format() -> String {
    "text".to_string()
}
