use leafswap_types::SwapEvent;
use serde::{Deserialize, Serialize};

/// Decides which committed swap events a subscriber sees.
///
/// The feed carries every committed write; the filter narrows it to the
/// slice a consumer cares about without the store knowing who is listening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapFilter {
    /// Every committed swap event.
    All,
    /// Events for swaps where the given user is sender or receiver.
    Participant(String),
    /// Events for a single swap.
    Swap(String),
}

impl SwapFilter {
    /// Filter on a participant's entire swap activity.
    pub fn participant(user_id: impl Into<String>) -> Self {
        Self::Participant(user_id.into())
    }

    /// Filter on one swap record.
    pub fn swap(swap_id: impl Into<String>) -> Self {
        Self::Swap(swap_id.into())
    }

    /// Whether an event passes this filter.
    pub fn matches(&self, event: &SwapEvent) -> bool {
        match self {
            Self::All => true,
            Self::Participant(user_id) => event.involves(user_id),
            Self::Swap(swap_id) => event.swap.id == *swap_id,
        }
    }
}

impl Default for SwapFilter {
    fn default() -> Self {
        Self::All
    }
}
