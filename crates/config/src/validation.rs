//! Configuration validation

use crate::{AppConfig, ConfigError, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every problem found in one validation pass
///
/// Kept as a list so callers can point at individual fields; the `Display`
/// form joins them for log lines and error messages.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&rendered)
    }
}

/// Validate the entire application configuration
///
/// Collects every problem instead of stopping at the first, so one reload
/// attempt reports everything an operator has to fix
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    if let Err(e) = validate_log_level(&config.log_level) {
        errors.push(e);
    }

    // Validate engine config
    if config.engine.conflict_retry.max_attempts == 0 {
        errors.push(ValidationError::new(
            "engine.conflict_retry.max_attempts",
            "must be greater than 0",
        ));
    }

    if config.engine.conflict_retry.initial_backoff_ms
        > config.engine.conflict_retry.max_backoff_ms
    {
        errors.push(ValidationError::new(
            "engine.conflict_retry.initial_backoff_ms",
            "must not exceed max_backoff_ms",
        ));
    }

    if config.engine.feed_capacity == 0 {
        errors.push(ValidationError::new(
            "engine.feed_capacity",
            "must be greater than 0",
        ));
    }

    // Validate store config
    if config.store.request_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "store.request_timeout_ms",
            "must be greater than 0",
        ));
    }

    // Return all errors if any were found
    if !errors.is_empty() {
        return Err(ConfigError::ValidationError(ValidationErrors(errors)));
    }

    Ok(())
}

/// Validate log level
fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "log_level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}
