//! # sqlite-pg-migrate
//!
//! Batched SQLite to PostgreSQL migration for the film catalog.
//!
//! The library moves the five catalog tables (`film_work`, `genre`,
//! `person`, `genre_film_work`, `person_film_work`) from a single SQLite
//! file into the `content` schema of a PostgreSQL database:
//!
//! - **Paged extraction** with memory bounded by the page size
//! - **Field mapping** from SQLite naming to PostgreSQL naming
//! - **Typed records** with defaults and coercion per entity
//! - **Chunked inserts** with explicit column lists
//! - **One transaction** per connection, committed on success and rolled
//!   back on failure
//! - **Optional read-back** of every table from both databases
//!
//! ## Example
//!
//! ```rust,no_run
//! use sqlite_pg_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> sqlite_pg_migrate::Result<()> {
//!     let config = Config::from_env()?;
//!     let result = Orchestrator::new(config)?.run().await?;
//!     println!("Migrated {} rows", result.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod lifecycle;
pub mod mapper;
pub mod orchestrator;
pub mod schema;
pub mod source;
pub mod target;

// Re-exports for convenient access
pub use config::{Config, LoggingConfig, MigrationConfig, SourceConfig, TargetConfig};
pub use crate::core::{Record, SourceReader, SqlValue, TargetWriter, Transactional};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    load_tables, verify_tables, MigrationResult, Orchestrator, TableCheck, TableReport,
};
pub use schema::{Entity, TableSpec};
pub use source::{SqliteExtractor, SqliteSource};
pub use target::{LoadStats, PgExtractor, PgSaver, PgTarget};
