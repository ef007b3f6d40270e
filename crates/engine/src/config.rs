use leafswap_lifecycle::RetryPolicy;
use leafswap_store::DEFAULT_FEED_CAPACITY;
use leafswap_types::SwapPolicy;
use serde::{Deserialize, Serialize};

/// Configuration for the swap engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lifecycle policy knobs
    pub policy: SwapPolicy,

    /// Conflict retry behaviour for guarded swap writes
    pub retry: RetryPolicy,

    /// Change feed buffer per subscriber before lagging
    pub feed_capacity: usize,
}

impl EngineConfig {
    pub fn with_policy(mut self, policy: SwapPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: SwapPolicy::default(),
            retry: RetryPolicy::default(),
            feed_capacity: DEFAULT_FEED_CAPACITY, // 256 events
        }
    }
}
