//! Centralized configuration for api-server.
//!
//! Server environment variables are loaded and validated at startup to fail
//! fast on misconfiguration rather than at request time. DynamoDB settings
//! (`DYNAMO_*`) are read by the `aws-dynamo` adapter itself.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost on restart)
    Memory,
    /// SQLite file-based storage
    Sqlite,
    /// AWS DynamoDB (or DynamoDB Local)
    Dynamo,
}

impl StorageProvider {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("sqlite") {
            Self::Sqlite
        } else if s.eq_ignore_ascii_case("dynamo") || s.eq_ignore_ascii_case("dynamodb") {
            Self::Dynamo
        } else {
            Self::Memory
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 5000)
    pub port: u16,
    /// Storage provider (default: memory)
    pub storage_provider: StorageProvider,
    /// SQLite database path (default: ./data/kanban.db)
    pub db_path: PathBuf,
    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; `from_env` passes `std::env`.
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                field: "PORT",
                message: format!("'{}' is not a valid port: {}", raw, e),
            })?,
            None => 5000,
        };

        let storage_provider =
            StorageProvider::from_str(&lookup("STORAGE_PROVIDER").unwrap_or_else(|| "memory".into()));

        let db_path = lookup("DB_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/kanban.db"));

        let log_format =
            LogFormat::from_str(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        Ok(Self {
            port,
            storage_provider,
            db_path,
            log_format,
        })
    }
}
