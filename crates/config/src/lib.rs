//! Configuration management for the medassist server
//!
//! Supports loading configuration from:
//! - YAML/TOML files under `config/`
//! - Environment variables (MEDASSIST__ prefix)

pub mod settings;

pub use settings::{
    load_settings, CacheConfig, LlmConfig, ObservabilityConfig, ServerConfig, Settings, TtsConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
