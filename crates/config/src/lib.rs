//! Configuration management for the leafswap engine
//!
//! Loads [`AppConfig`] from TOML, YAML, or JSON files, from `LEAFSWAP_*`
//! environment variables (nested keys use a `__` separator), or from both
//! with the environment winning key by key. Loaded documents go through
//! [`validate_config`], which collects every problem in one pass, and
//! [`ConfigWatcher`] hot-reloads a file while keeping the last good
//! configuration when an edit fails to parse or validate.

mod config;
mod loader;
mod validation;
mod watcher;

pub use config::*;
pub use loader::*;
pub use validation::*;
pub use watcher::*;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Config validation failed: {0}")]
    ValidationError(ValidationErrors),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config library error: {0}")]
    ConfigLibError(#[from] ::config::ConfigError),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    WatchError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
