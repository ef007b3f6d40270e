use serde::{Deserialize, Serialize};

/// A message attached to a swap conversation
///
/// The engine only ever writes the optional opening message of a proposal;
/// chat transport lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapMessage {
    /// Unique identifier
    pub id: String,

    /// Swap this message belongs to
    pub swap_id: String,

    /// Participant who wrote it
    pub sender_id: String,

    pub body: String,

    pub created_at: u64,
}

impl SwapMessage {
    pub fn new(
        id: impl Into<String>,
        swap_id: impl Into<String>,
        sender_id: impl Into<String>,
        body: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            swap_id: swap_id.into(),
            sender_id: sender_id.into(),
            body: body.into(),
            created_at,
        }
    }
}
