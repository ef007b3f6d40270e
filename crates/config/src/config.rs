//! Core configuration structures for the leafswap engine

use leafswap_types::SwapPolicy;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Environment type (production, staging, local)
    #[serde(default)]
    pub environment: Environment,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Engine configuration
    #[serde(default)]
    pub engine: EngineSection,

    /// Record store configuration
    #[serde(default)]
    pub store: StoreSection,
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Local,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Local => "local",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    /// Allow either participant to cancel an accepted swap
    #[serde(default = "default_true")]
    pub allow_cancelling_accepted: bool,

    /// Retry behaviour for conflicting swap writes
    #[serde(default)]
    pub conflict_retry: RetrySection,

    /// Change feed buffer per subscriber before lagging
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
}

impl EngineSection {
    /// The lifecycle policy this section describes
    pub fn policy(&self) -> SwapPolicy {
        SwapPolicy {
            allow_cancelling_accepted: self.allow_cancelling_accepted,
        }
    }
}

/// Conflict retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrySection {
    /// Maximum write attempts per operation
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// Record store configuration section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_feed_capacity() -> usize {
    256
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    25
}

fn default_max_backoff_ms() -> u64 {
    250
}

fn default_request_timeout_ms() -> u64 {
    5000 // 5 seconds
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            log_level: default_log_level(),
            engine: EngineSection::default(),
            store: StoreSection::default(),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Local
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            allow_cancelling_accepted: default_true(),
            conflict_retry: RetrySection::default(),
            feed_capacity: default_feed_capacity(),
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}
