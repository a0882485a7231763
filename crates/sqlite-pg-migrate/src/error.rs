//! Error types for the migration library.

use thiserror::Error;

/// Process exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code for SQLite errors.
pub const EXIT_SOURCE_ERROR: u8 = 2;
/// Process exit code for PostgreSQL errors.
pub const EXIT_TARGET_ERROR: u8 = 3;
/// Process exit code for rows that cannot be turned into records.
pub const EXIT_RECORD_ERROR: u8 = 4;
/// Process exit code for failed table loads.
pub const EXIT_TRANSFER_ERROR: u8 = 5;
/// Process exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (missing variable, invalid YAML, bad value)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database connection or query error
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// Target database connection or query error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// A field the entity cannot default is absent from the row
    #[error("{table}: missing required field '{field}'")]
    MissingField { table: String, field: String },

    /// A field is present but cannot be coerced to the entity's type
    #[error("{table}: invalid value for '{field}': {message}")]
    InvalidField {
        table: String,
        field: String,
        message: String,
    },

    /// The source row carries a column the entity does not declare
    #[error("{table}: unexpected field '{field}'")]
    UnexpectedField { table: String, field: String },

    /// Loading a specific table failed
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing(table: impl Into<String>, field: impl Into<String>) -> Self {
        MigrateError::MissingField {
            table: table.into(),
            field: field.into(),
        }
    }

    /// Create an InvalidField error
    pub fn invalid(
        table: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MigrateError::InvalidField {
            table: table.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Json(_) => {
                EXIT_CONFIG_ERROR
            }
            MigrateError::Source(_) => EXIT_SOURCE_ERROR,
            MigrateError::Target(_) => EXIT_TARGET_ERROR,
            MigrateError::MissingField { .. }
            | MigrateError::InvalidField { .. }
            | MigrateError::UnexpectedField { .. } => EXIT_RECORD_ERROR,
            MigrateError::Transfer { .. } => EXIT_TRANSFER_ERROR,
            MigrateError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(
            MigrateError::missing("genre", "name").exit_code(),
            EXIT_RECORD_ERROR
        );
        assert_eq!(
            MigrateError::transfer("genre", "boom").exit_code(),
            EXIT_TRANSFER_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(MigrateError::from(io).exit_code(), EXIT_IO_ERROR);
    }

    #[test]
    fn test_messages_name_table_and_field() {
        let err = MigrateError::invalid("film_work", "rating", "150 is outside [0, 100]");
        assert_eq!(
            err.to_string(),
            "film_work: invalid value for 'rating': 150 is outside [0, 100]"
        );
    }

    #[test]
    fn test_format_detailed_includes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "db.sqlite");
        let detailed = MigrateError::from(io).format_detailed();
        assert!(detailed.starts_with("Error: IO error: db.sqlite"));
    }
}
