//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from process environment variables.
    ///
    /// Reads `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `DB_HOST`, `DB_PORT`,
    /// `DB_SCHEMA`, `DB_SSL_MODE`, `SQLITE_PATH`, `EXTRACT_CHUNK_SIZE`,
    /// `LOAD_CHUNK_SIZE`, `VERIFY_AFTER_LOAD`, `LOG_LEVEL` and `LOG_FORMAT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| MigrateError::Config(format!("{} must be set", key)))
        };

        let config = Config {
            source: SourceConfig {
                path: PathBuf::from(required("SQLITE_PATH")?),
            },
            target: TargetConfig {
                host: var("DB_HOST").unwrap_or_else(default_host),
                port: parse_var(&var, "DB_PORT")?.unwrap_or_else(default_pg_port),
                database: required("DB_NAME")?,
                user: required("DB_USER")?,
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                schema: var("DB_SCHEMA").unwrap_or_else(default_content_schema),
                ssl_mode: var("DB_SSL_MODE").unwrap_or_else(default_disable),
            },
            migration: MigrationConfig {
                extract_chunk_size: parse_var(&var, "EXTRACT_CHUNK_SIZE")?
                    .unwrap_or(DEFAULT_EXTRACT_CHUNK_SIZE),
                load_chunk_size: parse_var(&var, "LOAD_CHUNK_SIZE")?
                    .unwrap_or(DEFAULT_LOAD_CHUNK_SIZE),
                verify: parse_var(&var, "VERIFY_AFTER_LOAD")?.unwrap_or(false),
            },
            logging: LoggingConfig {
                level: var("LOG_LEVEL").unwrap_or_else(default_log_level),
                format: var("LOG_FORMAT").unwrap_or_else(default_log_format),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| MigrateError::Config(format!("{} is invalid ({}): {}", key, raw, e)))
        })
        .transpose()
}

impl TargetConfig {
    /// Describe the target for log lines, without the password.
    pub fn display_target(&self) -> String {
        format!(
            "{}@{}:{}/{} (schema {})",
            self.user, self.host, self.port, self.database, self.schema
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn minimal_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DB_NAME", "movies_database"),
            ("DB_USER", "app"),
            ("DB_PASSWORD", "123qwe"),
            ("SQLITE_PATH", "db.sqlite"),
        ]
    }

    #[test]
    fn test_env_defaults() {
        let config = Config::from_lookup(lookup_from(&minimal_env())).unwrap();
        assert_eq!(config.target.host, "127.0.0.1");
        assert_eq!(config.target.port, 5432);
        assert_eq!(config.target.schema, "content");
        assert_eq!(config.target.ssl_mode, "disable");
        assert_eq!(config.source.path, PathBuf::from("db.sqlite"));
        assert_eq!(config.migration.extract_chunk_size, 50);
        assert_eq!(config.migration.load_chunk_size, 50);
        assert!(!config.migration.verify);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_env_overrides() {
        let mut env = minimal_env();
        env.extend([
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("LOAD_CHUNK_SIZE", "200"),
            ("VERIFY_AFTER_LOAD", "true"),
            ("LOG_LEVEL", "INFO"),
        ]);
        let config = Config::from_lookup(lookup_from(&env)).unwrap();
        assert_eq!(config.target.host, "db.internal");
        assert_eq!(config.target.port, 6543);
        assert_eq!(config.migration.load_chunk_size, 200);
        assert!(config.migration.verify);
        assert_eq!(config.logging.level, "INFO");
    }

    #[test]
    fn test_env_missing_sqlite_path() {
        let env: Vec<_> = minimal_env()
            .into_iter()
            .filter(|(k, _)| *k != "SQLITE_PATH")
            .collect();
        let err = Config::from_lookup(lookup_from(&env)).unwrap_err();
        assert!(err.to_string().contains("SQLITE_PATH must be set"));
    }

    #[test]
    fn test_env_invalid_port() {
        let mut env = minimal_env();
        env.push(("DB_PORT", "not-a-port"));
        let err = Config::from_lookup(lookup_from(&env)).unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn test_blank_variable_falls_back_to_default() {
        let mut env = minimal_env();
        env.push(("DB_HOST", "  "));
        let config = Config::from_lookup(lookup_from(&env)).unwrap();
        assert_eq!(config.target.host, "127.0.0.1");
    }

    #[test]
    fn test_from_yaml_applies_defaults() {
        let yaml = r#"
source:
  path: /data/db.sqlite
target:
  database: movies_database
  user: app
  password: secret
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.target.port, 5432);
        assert_eq!(config.target.schema, "content");
        assert_eq!(config.migration.load_chunk_size, 50);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_from_yaml_missing_target_is_error() {
        let yaml = "source:\n  path: db.sqlite\n";
        assert!(matches!(
            Config::from_yaml(yaml).unwrap_err(),
            MigrateError::Yaml(_)
        ));
    }

    #[test]
    fn test_display_target_omits_password() {
        let config = Config::from_lookup(lookup_from(&minimal_env())).unwrap();
        let shown = config.target.display_target();
        assert_eq!(shown, "app@127.0.0.1:5432/movies_database (schema content)");
        assert!(!shown.contains("123qwe"));
    }
}
