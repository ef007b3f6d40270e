use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A cross-store side effect that failed after the primary write committed
///
/// There are no transactions across the plant and swap stores, so these are
/// reported next to an otherwise successful result instead of aborting it.
/// Reconciliation repairs the drift they describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ConsistencyWarning {
    #[error("plant {plant_id} not flipped to available={wanted} for swap {swap_id}: {reason}")]
    AvailabilityNotUpdated {
        swap_id: String,
        plant_id: String,
        wanted: bool,
        reason: String,
    },

    #[error("plant {plant_id} not transferred to {new_owner} for swap {swap_id}: {reason}")]
    OwnershipNotTransferred {
        swap_id: String,
        plant_id: String,
        new_owner: String,
        reason: String,
    },

    #[error("opening message for swap {swap_id} was not recorded: {reason}")]
    MessageNotRecorded { swap_id: String, reason: String },
}

impl ConsistencyWarning {
    /// Swap whose side effects drifted
    pub fn swap_id(&self) -> &str {
        match self {
            ConsistencyWarning::AvailabilityNotUpdated { swap_id, .. } => swap_id,
            ConsistencyWarning::OwnershipNotTransferred { swap_id, .. } => swap_id,
            ConsistencyWarning::MessageNotRecorded { swap_id, .. } => swap_id,
        }
    }
}
