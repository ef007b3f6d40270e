use crate::Swap;
use serde::{Deserialize, Serialize};

/// What happened to the swap record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapEventKind {
    Created,
    Updated,
    Deleted,
}

/// A committed swap-store write, as seen on the change feed
///
/// Events are refresh hints, not a replayable log: consumers that fall
/// behind resynchronize with a full fetch instead of asking for history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapEvent {
    pub kind: SwapEventKind,

    /// Snapshot of the record at commit time (for deletes, the last state)
    pub swap: Swap,
}

impl SwapEvent {
    pub fn created(swap: Swap) -> Self {
        Self {
            kind: SwapEventKind::Created,
            swap,
        }
    }

    pub fn updated(swap: Swap) -> Self {
        Self {
            kind: SwapEventKind::Updated,
            swap,
        }
    }

    pub fn deleted(swap: Swap) -> Self {
        Self {
            kind: SwapEventKind::Deleted,
            swap,
        }
    }

    /// Check whether the event concerns a swap this participant is part of
    pub fn involves(&self, participant_id: &str) -> bool {
        self.swap.is_participant(participant_id)
    }
}
