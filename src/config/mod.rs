//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `TAPCARD` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use tapcard::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod email;
mod error;
mod payment;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub payment: PaymentConfig,

    #[serde(default)]
    pub email: EmailConfig,
}

impl AppConfig {
    /// Load configuration from `.env` (if present) and the environment.
    ///
    /// - `TAPCARD__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TAPCARD__PAYMENT__PAYSTACK_SECRET_KEY=...` -> `payment.paystack_secret_key`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into their types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TAPCARD")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate(self.server.environment)?;
        self.auth.validate()?;
        self.payment.validate()?;
        self.email.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
