//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use course_file_core::settings::MAX_DEFAULT_DEADLINE_DAYS;
use course_file_core::{RevertPolicy, WorkflowSettings};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where the workflow data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("'{}' is not one of postgres, memory", other)),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => f.write_str("postgres"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub storage_backend: StorageBackend,
    /// Required when `storage_backend` is Postgres.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub cors_origin: String,
    /// JSON organisation seed for the in-memory backend.
    pub seed_path: Option<PathBuf>,
    pub default_deadline_days: i64,
    pub revert_policy: RevertPolicy,
    pub alert_limit: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server ---
        let bind_address: SocketAddr = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?;
        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Storage ---
        let storage_backend: StorageBackend = parse_or(&lookup, "STORAGE_BACKEND", "postgres")?;
        let database_url = lookup("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }
        let db_max_connections: u32 = parse_or(&lookup, "DB_MAX_CONNECTIONS", "5")?;
        let seed_path = lookup("SEED_PATH").map(PathBuf::from);

        // --- Workflow ---
        let default_deadline_days: i64 = parse_or(&lookup, "DEFAULT_DEADLINE_DAYS", "15")?;
        if !(0..=MAX_DEFAULT_DEADLINE_DAYS).contains(&default_deadline_days) {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_DEADLINE_DAYS".to_string(),
                format!("must be between 0 and {}", MAX_DEFAULT_DEADLINE_DAYS),
            ));
        }
        let revert_policy: RevertPolicy =
            parse_or(&lookup, "REVERT_POLICY", RevertPolicy::default().as_str())?;
        let alert_limit: u32 = parse_or(&lookup, "ALERT_LIMIT", "500")?;

        Ok(Self {
            bind_address,
            storage_backend,
            database_url,
            db_max_connections,
            log_level,
            cors_origin,
            seed_path,
            default_deadline_days,
            revert_policy,
            alert_limit,
        })
    }

    /// The subset of the configuration the workflow engine consumes.
    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            default_deadline_days: self.default_deadline_days,
            revert_policy: self.revert_policy,
            alert_limit: self.alert_limit,
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = lookup(name).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_with_only_a_database_url() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/course_files")]).unwrap();

        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.default_deadline_days, 15);
        assert_eq!(config.revert_policy, RevertPolicy::SelfApproverBypass);
        assert_eq!(config.alert_limit, 500);
        assert!(config.seed_path.is_none());
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(name) if name == "DATABASE_URL"));
    }

    #[test]
    fn memory_backend_runs_without_database() {
        let config = load(&[
            ("STORAGE_BACKEND", "Memory"),
            ("SEED_PATH", "./seed.json"),
            ("REVERT_POLICY", "lock_on_hod_decision"),
            ("DEFAULT_DEADLINE_DAYS", "7"),
        ])
        .unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(config.database_url.is_none());
        assert_eq!(config.seed_path, Some(PathBuf::from("./seed.json")));

        let settings = config.workflow_settings();
        assert_eq!(settings.revert_policy, RevertPolicy::LockOnHodDecision);
        assert_eq!(settings.default_deadline_days, 7);
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let cases = [
            ("BIND_ADDRESS", "not-an-address"),
            ("ALERT_LIMIT", "-1"),
            ("REVERT_POLICY", "sometimes"),
            ("STORAGE_BACKEND", "sqlite"),
            ("RUST_LOG", "chatty"),
            ("DEFAULT_DEADLINE_DAYS", "-3"),
            ("DEFAULT_DEADLINE_DAYS", "200000000"),
        ];
        for (name, value) in cases {
            let err = load(&[("STORAGE_BACKEND", "memory"), (name, value)]).unwrap_err();
            match err {
                ConfigError::InvalidValue(var, _) => assert_eq!(var, name),
                other => panic!("{name}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn deadline_offset_is_bounded() {
        let max = MAX_DEFAULT_DEADLINE_DAYS.to_string();
        let config = load(&[("STORAGE_BACKEND", "memory"), ("DEFAULT_DEADLINE_DAYS", max.as_str())]).unwrap();
        assert_eq!(config.default_deadline_days, MAX_DEFAULT_DEADLINE_DAYS);

        let over = (MAX_DEFAULT_DEADLINE_DAYS + 1).to_string();
        let err = load(&[("STORAGE_BACKEND", "memory"), ("DEFAULT_DEADLINE_DAYS", over.as_str())]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "DEFAULT_DEADLINE_DAYS"));
    }
}
