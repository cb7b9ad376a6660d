//! Client configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `ESEWA` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use esewa_client::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Submitting payments to {}", config.gateway.form_url());
//! ```

mod environment;
mod error;
mod gateway;

pub use environment::{Environment, GatewayEndpoints};
pub use error::{ConfigError, ValidationError};
pub use gateway::{GatewayConfig, InitiationMode};

use serde::Deserialize;

/// Root configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// eSewa merchant credentials and endpoints
    pub gateway: GatewayConfig,

    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ESEWA` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `ESEWA__GATEWAY__SECRET_KEY=...` -> `gateway.secret_key = ...`
    /// - `ESEWA__GATEWAY__ENVIRONMENT=production` -> `gateway.environment = production`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types (including an unknown environment)
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ESEWA")
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
        self.gateway.validate()
    }

    /// Check if talking to the live gateway
    pub fn is_production(&self) -> bool {
        self.gateway.environment.is_production()
    }
}

fn default_log_level() -> String {
    "info,esewa_client=debug".to_string()
}
