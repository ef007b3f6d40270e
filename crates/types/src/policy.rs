use serde::{Deserialize, Serialize};

/// Marketplace policy knobs that change which transitions are legal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPolicy {
    /// Whether either participant may cancel a swap that was already
    /// accepted (moving it to rejected)
    #[serde(default = "default_allow_cancelling_accepted")]
    pub allow_cancelling_accepted: bool,
}

fn default_allow_cancelling_accepted() -> bool {
    true
}

impl Default for SwapPolicy {
    fn default() -> Self {
        Self {
            allow_cancelling_accepted: true,
        }
    }
}
