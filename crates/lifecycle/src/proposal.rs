use crate::{current_timestamp, AvailabilitySync};
use leafswap_store::{MessageStore, PlantStore, StoreError, SwapStore};
use leafswap_types::{ConsistencyWarning, Swap, SwapMessage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("sender {sender_id} has no available plants to offer")]
    NoAvailablePlants { sender_id: String },

    #[error("plant {plant_id} is not among {sender_id}'s available plants")]
    OfferedPlantNotEligible {
        sender_id: String,
        plant_id: String,
    },

    #[error("target plant not found: {0}")]
    TargetPlantNotFound(String),

    #[error("target plant {plant_id} is not available for swapping")]
    TargetPlantUnavailable { plant_id: String },

    #[error("target plant {plant_id} already belongs to {sender_id}")]
    SelfSwapForbidden {
        sender_id: String,
        plant_id: String,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Everything a sender specifies when proposing a swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub sender_id: String,
    pub sender_plant_id: String,
    pub target_plant_id: String,
    pub swap_point_id: Option<String>,
    pub initial_message: Option<String>,
}

impl ProposalRequest {
    pub fn new(
        sender_id: impl Into<String>,
        sender_plant_id: impl Into<String>,
        target_plant_id: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_plant_id: sender_plant_id.into(),
            target_plant_id: target_plant_id.into(),
            swap_point_id: None,
            initial_message: None,
        }
    }

    pub fn with_swap_point(mut self, swap_point_id: impl Into<String>) -> Self {
        self.swap_point_id = Some(swap_point_id.into());
        self
    }

    pub fn with_message(mut self, body: impl Into<String>) -> Self {
        self.initial_message = Some(body.into());
        self
    }
}

/// A created proposal plus whatever side effects did not land
#[derive(Debug)]
pub struct ProposalOutcome {
    pub swap: Swap,

    /// The recorded opening message, when one was requested and stored
    pub message: Option<SwapMessage>,

    pub warnings: Vec<ConsistencyWarning>,
}

/// Validates swap proposals and creates the pending swap
///
/// Checks run in a fixed order and each failure names its own error, so a
/// client can tell "you have nothing to offer" apart from "that plant is
/// taken". Validation reads plant state that can change before the create
/// commits; the availability flip after the create is what actually takes
/// both plants off the market.
pub struct ProposalFactory<S, P, M> {
    swaps: Arc<S>,
    plants: Arc<P>,
    messages: Arc<M>,
    availability: AvailabilitySync<P>,
}

impl<S, P, M> ProposalFactory<S, P, M>
where
    S: SwapStore,
    P: PlantStore,
    M: MessageStore,
{
    pub fn new(swaps: Arc<S>, plants: Arc<P>, messages: Arc<M>) -> Self {
        let availability = AvailabilitySync::new(Arc::clone(&plants));
        Self {
            swaps,
            plants,
            messages,
            availability,
        }
    }

    /// Validate eligibility and create a pending swap
    pub async fn propose(
        &self,
        request: ProposalRequest,
    ) -> Result<ProposalOutcome, ProposalError> {
        // 1. The sender must have something to offer
        let senders_available = self
            .plants
            .list_available_by_owner(&request.sender_id)
            .await?;
        if senders_available.is_empty() {
            return Err(ProposalError::NoAvailablePlants {
                sender_id: request.sender_id,
            });
        }

        // 2. The offered plant must be in that set
        if !senders_available
            .iter()
            .any(|p| p.id == request.sender_plant_id)
        {
            return Err(ProposalError::OfferedPlantNotEligible {
                sender_id: request.sender_id,
                plant_id: request.sender_plant_id,
            });
        }

        // 3. The target plant must exist and be on the market
        let target = self
            .plants
            .get(&request.target_plant_id)
            .await?
            .ok_or_else(|| ProposalError::TargetPlantNotFound(request.target_plant_id.clone()))?;
        if !target.available {
            return Err(ProposalError::TargetPlantUnavailable {
                plant_id: target.id,
            });
        }

        // 4. No swapping with yourself
        if target.owner_id == request.sender_id {
            return Err(ProposalError::SelfSwapForbidden {
                sender_id: request.sender_id,
                plant_id: target.id,
            });
        }

        let now = current_timestamp();
        let swap = Swap::new(
            Uuid::new_v4().to_string(),
            request.sender_id,
            target.owner_id,
            request.sender_plant_id,
            request.target_plant_id,
            request.swap_point_id,
            now,
        );

        self.swaps.create(&swap).await?;
        info!(
            swap_id = %swap.id,
            sender = %swap.sender_id,
            receiver = %swap.receiver_id,
            "swap proposed"
        );

        // Reserve both plants; the proposal stands even if a flip fails
        let mut warnings = self.availability.apply(&swap, swap.status).await;

        let message = self
            .record_opening_message(&swap, request.initial_message, &mut warnings)
            .await;

        Ok(ProposalOutcome {
            swap,
            message,
            warnings,
        })
    }

    async fn record_opening_message(
        &self,
        swap: &Swap,
        body: Option<String>,
        warnings: &mut Vec<ConsistencyWarning>,
    ) -> Option<SwapMessage> {
        let body = match body {
            Some(body) if !body.trim().is_empty() => body,
            _ => return None,
        };

        let message = SwapMessage::new(
            Uuid::new_v4().to_string(),
            swap.id.clone(),
            swap.sender_id.clone(),
            body,
            current_timestamp(),
        );

        match self.messages.create(&message).await {
            Ok(()) => Some(message),
            Err(err) => {
                warn!(swap_id = %swap.id, error = %err, "opening message not recorded");
                warnings.push(ConsistencyWarning::MessageNotRecorded {
                    swap_id: swap.id.clone(),
                    reason: err.to_string(),
                });
                None
            }
        }
    }
}
