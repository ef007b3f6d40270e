use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a swap
///
/// The enum is closed on purpose: every consumer matches exhaustively, so a
/// new status fails compilation everywhere it matters instead of falling
/// through a string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    /// Proposed, waiting for the receiver's decision
    Pending,

    /// Receiver agreed; the exchange is being arranged
    Accepted,

    /// Declined or cancelled (terminal)
    Rejected,

    /// Both parties confirmed the exchange happened (terminal)
    Completed,
}

impl SwapStatus {
    /// Terminal statuses admit no further writes
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapStatus::Rejected | SwapStatus::Completed)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Availability both referenced plants must have once a swap carries
    /// this status
    ///
    /// Completion keeps plants off the market: the new owner re-lists
    /// deliberately rather than inheriting an open listing.
    pub fn plants_available_after(&self) -> bool {
        match self {
            SwapStatus::Pending => false,
            SwapStatus::Accepted => false,
            SwapStatus::Rejected => true,
            SwapStatus::Completed => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Completed => "completed",
        }
    }

    pub const ALL: [SwapStatus; 4] = [
        SwapStatus::Pending,
        SwapStatus::Accepted,
        SwapStatus::Rejected,
        SwapStatus::Completed,
    ];
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown swap status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for SwapStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SwapStatus::Pending),
            "accepted" => Ok(SwapStatus::Accepted),
            "rejected" => Ok(SwapStatus::Rejected),
            "completed" => Ok(SwapStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A participant's role within one swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapRole {
    /// Proposed the swap and offered their plant
    Sender,

    /// Owns the targeted plant and decides on the proposal
    Receiver,
}

/// A proposed exchange of one plant for another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap {
    // ═══════════════════════════════════════════════════════════════════════════
    // IDENTIFICATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Unique identifier
    pub id: String,

    // ═══════════════════════════════════════════════════════════════════════════
    // PARTICIPANTS AND PLANTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Participant who proposed the swap
    pub sender_id: String,

    /// Owner of the targeted plant
    pub receiver_id: String,

    /// Plant the sender offers
    pub sender_plant_id: String,

    /// Plant the sender wants
    pub receiver_plant_id: String,

    /// Agreed meeting point, if any
    pub swap_point_id: Option<String>,

    // ═══════════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════════

    pub status: SwapStatus,

    /// Sender confirmed the physical exchange
    pub sender_completed: bool,

    /// Receiver confirmed the physical exchange
    pub receiver_completed: bool,

    pub created_at: u64,
    pub updated_at: u64,
}

impl Swap {
    /// Create a freshly proposed swap
    pub fn new(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        sender_plant_id: impl Into<String>,
        receiver_plant_id: impl Into<String>,
        swap_point_id: Option<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            sender_plant_id: sender_plant_id.into(),
            receiver_plant_id: receiver_plant_id.into(),
            swap_point_id,
            status: SwapStatus::Pending,
            sender_completed: false,
            receiver_completed: false,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_participant(&self, participant_id: &str) -> bool {
        self.sender_id == participant_id || self.receiver_id == participant_id
    }

    /// Role of `participant_id` in this swap, if they are part of it
    pub fn role_of(&self, participant_id: &str) -> Option<SwapRole> {
        if self.sender_id == participant_id {
            Some(SwapRole::Sender)
        } else if self.receiver_id == participant_id {
            Some(SwapRole::Receiver)
        } else {
            None
        }
    }

    /// The other participant, if `participant_id` is part of the swap
    pub fn counterparty(&self, participant_id: &str) -> Option<&str> {
        match self.role_of(participant_id)? {
            SwapRole::Sender => Some(&self.receiver_id),
            SwapRole::Receiver => Some(&self.sender_id),
        }
    }

    /// Completion flag recorded for the given role
    pub fn completed_by(&self, role: SwapRole) -> bool {
        match role {
            SwapRole::Sender => self.sender_completed,
            SwapRole::Receiver => self.receiver_completed,
        }
    }

    pub fn both_completed(&self) -> bool {
        self.sender_completed && self.receiver_completed
    }

    /// Both referenced plant ids, sender's first
    pub fn plant_ids(&self) -> [&str; 2] {
        [&self.sender_plant_id, &self.receiver_plant_id]
    }

    /// Chat stays open while the swap is still being arranged
    pub fn chat_open(&self) -> bool {
        self.status.is_active()
    }
}
