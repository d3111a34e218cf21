//! Configuration system for the StaffHelp server.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! The database connection string is the one setting with no default: it must
//! be supplied via `DATABASE_URL`, and the process refuses to start without it.
//!
//! # Environment Variables
//!
//! - `STAFFHELP_SERVER_HOST` - Server bind address
//! - `STAFFHELP_SERVER_PORT` - Server port
//! - `STAFFHELP_DATABASE_TYPE` - "sqlite" or "postgres"
//! - `DATABASE_URL` - Database connection URL (required)
//! - `STAFFHELP_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{ServiceError, ServiceResult};

/// Global configuration singleton.
static CONFIG: OnceLock<StaffHelpConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StaffHelpConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// License key configuration
    pub license: LicenseConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// License key generation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// Number of dash-separated groups in a generated key
    pub key_segments: u8,
    /// Characters per group
    pub key_segment_length: u8,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            key_segments: 3,
            key_segment_length: 5,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// Connection URL. No default; comes from `DATABASE_URL`.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "postgres".to_string(),
            url: String::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl StaffHelpConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    fn load() -> ServiceResult<Self> {
        let builder = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            .set_default("server.port", 8000)
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            .set_default("license.key_segments", 3)
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            .set_default("license.key_segment_length", 5)
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            .set_default("database.db_type", "postgres")
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            .set_default("database.url", "")
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            .set_default("logging.level", "info")
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option("server.host", env::var("STAFFHELP_SERVER_HOST").ok())
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            .set_override_option(
                "server.port",
                env::var("STAFFHELP_SERVER_PORT")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            .set_override_option(
                "database.db_type",
                env::var("STAFFHELP_DATABASE_TYPE").ok(),
            )
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?
            .set_override_option("logging.level", env::var("STAFFHELP_LOG_LEVEL").ok())
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?;

        let settings = builder
            .build()
            .map_err(|e| ServiceError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| ServiceError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.server.port == 0 {
            return Err(ServiceError::ConfigError(
                "server.port must be greater than 0".to_string(),
            ));
        }

        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(ServiceError::ConfigError(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }

        if self.database.url.is_empty() {
            return Err(ServiceError::ConfigError(
                "DATABASE_URL is not set".to_string(),
            ));
        }

        if self.license.key_segments == 0 {
            return Err(ServiceError::ConfigError(
                "license.key_segments must be greater than 0".to_string(),
            ));
        }
        if self.license.key_segment_length == 0 {
            return Err(ServiceError::ConfigError(
                "license.key_segment_length must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ServiceError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> ServiceResult<&'static StaffHelpConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = StaffHelpConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either copy is equivalent.
    let _ = CONFIG.set(config.clone());

    Ok(CONFIG.get().expect("config was just set"))
}

/// Initialize configuration explicitly.
///
/// Call this early in the entry point to catch configuration errors before
/// binding sockets or opening pools.
pub fn init_config() -> ServiceResult<&'static StaffHelpConfig> {
    get_config()
}
