//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `NEWSPORTAL_` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use newsportal_pipeline::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod error;
mod pipeline;
mod storage;

pub use ai::{AiConfig, IllustratorProvider, RewriterProvider};
pub use error::{ConfigError, ValidationError};
pub use pipeline::PipelineConfig;
pub use storage::StorageConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// AI provider configuration (rewriter + illustrator)
    #[serde(default)]
    pub ai: AiConfig,

    /// Worker and retry configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Blob storage configuration
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `NEWSPORTAL` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `NEWSPORTAL__AI__OPENAI_API_KEY=sk-...` -> `ai.openai_api_key`
    /// - `NEWSPORTAL__PIPELINE__MAX_ATTEMPTS=5` -> `pipeline.max_attempts`
    /// - `NEWSPORTAL__STORAGE__ENDPOINT=http://minio:9000` -> `storage.endpoint`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("NEWSPORTAL")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.pipeline.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("NEWSPORTAL__AI__OPENAI_API_KEY", "sk-test");
        env::set_var("NEWSPORTAL__STORAGE__ENDPOINT", "http://minio:9000");
        env::set_var(
            "NEWSPORTAL__STORAGE__PUBLIC_BASE_URL",
            "https://media.example.com",
        );
    }

    fn clear_env() {
        env::remove_var("NEWSPORTAL__AI__OPENAI_API_KEY");
        env::remove_var("NEWSPORTAL__AI__REWRITER");
        env::remove_var("NEWSPORTAL__STORAGE__ENDPOINT");
        env::remove_var("NEWSPORTAL__STORAGE__PUBLIC_BASE_URL");
        env::remove_var("NEWSPORTAL__PIPELINE__MAX_ATTEMPTS");
    }

    #[test]
    fn loads_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.ai.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.storage.endpoint, "http://minio:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_overrides_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("NEWSPORTAL__PIPELINE__MAX_ATTEMPTS", "3");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.pipeline.max_attempts, 3);
    }
}
