//! Leafswap: swap lifecycle management for plant-swap marketplaces.
//!
//! The workspace splits the engine into focused crates. This package
//! re-exports them under one roof and hosts the cross-crate test suites.

pub use leafswap_config as config;
pub use leafswap_engine as engine;
pub use leafswap_lifecycle as lifecycle;
pub use leafswap_notify as notify;
pub use leafswap_store as store;
pub use leafswap_types as types;

pub use leafswap_config::AppConfig;
pub use leafswap_engine::{EngineConfig, EngineError, SwapEngine};
pub use leafswap_lifecycle::RetryPolicy;
pub use leafswap_types::{Swap, SwapPolicy, SwapStatus};

/// Build the engine configuration from a loaded application config.
///
/// Deployables load an [`AppConfig`] from file and environment, then hand
/// the engine-facing slice of it to [`SwapEngine`].
pub fn engine_config(app: &AppConfig) -> EngineConfig {
    EngineConfig {
        policy: app.engine.policy(),
        retry: RetryPolicy {
            max_attempts: app.engine.conflict_retry.max_attempts,
            initial_backoff_ms: app.engine.conflict_retry.initial_backoff_ms,
            max_backoff_ms: app.engine.conflict_retry.max_backoff_ms,
        },
        feed_capacity: app.engine.feed_capacity,
    }
}
