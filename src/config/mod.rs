//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `THREAD_RELAY` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use thread_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod blob;
mod database;
mod error;
mod messaging;
mod redis;
mod runtime;

pub use blob::BlobConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use messaging::MessagingConfig;
pub use self::redis::RedisConfig;
pub use runtime::RuntimeConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis configuration (cache and outbound transport)
    pub redis: RedisConfig,

    /// Database configuration (PostgreSQL, the durable tier)
    pub database: DatabaseConfig,

    /// Blob tier configuration (session-history storage)
    #[serde(default)]
    pub blob: BlobConfig,

    /// Agent runtime configuration
    pub runtime: RuntimeConfig,

    /// Message bus configuration
    #[serde(default)]
    pub messaging: MessagingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads a `.env` file if present, then reads environment variables
    /// with the `THREAD_RELAY` prefix:
    ///
    /// - `THREAD_RELAY__REDIS__URL=redis://...` -> `redis.url`
    /// - `THREAD_RELAY__DATABASE__URL=postgres://...` -> `database.url`
    /// - `THREAD_RELAY__RUNTIME__BASE_URL=http://...` -> `runtime.base_url`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when required variables are missing or a
    /// value cannot be parsed into its typed field.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("THREAD_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.redis.validate()?;
        self.database.validate()?;
        self.blob.validate()?;
        self.runtime.validate()?;
        self.messaging.validate()?;
        Ok(())
    }
}
