use crate::{current_timestamp, AvailabilitySync, RetryPolicy};
use leafswap_store::{PlantStore, StoreError, SwapChanges, SwapGuard, SwapStore};
use leafswap_types::{ConsistencyWarning, Swap, SwapPolicy, SwapRole, SwapStatus};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("swap not found: {0}")]
    NotFound(String),

    #[error("swap {swap_id}: illegal transition {from} -> {to}")]
    InvalidTransition {
        swap_id: String,
        from: SwapStatus,
        to: SwapStatus,
    },

    #[error("swap {swap_id}: {actor} may not move this swap to {to}")]
    UnauthorizedActor {
        swap_id: String,
        actor: String,
        to: SwapStatus,
    },

    #[error("swap {swap_id}: completed is reached through both participants confirming, not a direct transition")]
    CompletionRequiresConfirmation { swap_id: String },

    #[error("swap {swap_id}: cancelling an accepted swap is disabled")]
    CancellationDisabled { swap_id: String },

    #[error("swap {swap_id}: transition lost to concurrent writes, retries exhausted")]
    Conflict { swap_id: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// A committed transition plus whatever side effects did not land
#[derive(Debug)]
pub struct TransitionOutcome {
    pub swap: Swap,
    pub warnings: Vec<ConsistencyWarning>,
}

/// Check one requested move against the transition table, without I/O
///
/// Legal moves: pending -> accepted / rejected (receiver decides),
/// accepted -> rejected (either participant, when policy allows).
/// `completed` is never a legal direct target; the dual-confirmation
/// handshake owns it. Terminal statuses admit nothing.
pub fn check_transition(
    swap: &Swap,
    to: SwapStatus,
    actor: &str,
    policy: &SwapPolicy,
) -> Result<(), TransitionError> {
    match (swap.status, to) {
        (SwapStatus::Pending, SwapStatus::Accepted) | (SwapStatus::Pending, SwapStatus::Rejected) => {
            if swap.role_of(actor) != Some(SwapRole::Receiver) {
                return Err(TransitionError::UnauthorizedActor {
                    swap_id: swap.id.clone(),
                    actor: actor.to_string(),
                    to,
                });
            }
            Ok(())
        }
        (SwapStatus::Accepted, SwapStatus::Rejected) => {
            if !swap.is_participant(actor) {
                return Err(TransitionError::UnauthorizedActor {
                    swap_id: swap.id.clone(),
                    actor: actor.to_string(),
                    to,
                });
            }
            if !policy.allow_cancelling_accepted {
                return Err(TransitionError::CancellationDisabled {
                    swap_id: swap.id.clone(),
                });
            }
            Ok(())
        }
        (SwapStatus::Accepted, SwapStatus::Completed) => {
            Err(TransitionError::CompletionRequiresConfirmation {
                swap_id: swap.id.clone(),
            })
        }
        (from, to) => Err(TransitionError::InvalidTransition {
            swap_id: swap.id.clone(),
            from,
            to,
        }),
    }
}

/// Validates and persists direct status transitions
///
/// The status write is conditional on the status the request was validated
/// against, so two racing writers cannot both win; the loser refetches and
/// revalidates under the retry policy. Availability side effects run after
/// the commit and report failures as warnings.
pub struct SwapStateMachine<S, P> {
    swaps: Arc<S>,
    availability: AvailabilitySync<P>,
    policy: SwapPolicy,
    retry: RetryPolicy,
}

impl<S, P> SwapStateMachine<S, P>
where
    S: SwapStore,
    P: PlantStore,
{
    pub fn new(swaps: Arc<S>, plants: Arc<P>, policy: SwapPolicy, retry: RetryPolicy) -> Self {
        Self {
            swaps,
            availability: AvailabilitySync::new(plants),
            policy,
            retry,
        }
    }

    pub fn policy(&self) -> &SwapPolicy {
        &self.policy
    }

    /// Move a swap to `to` on behalf of `actor`
    pub async fn transition(
        &self,
        swap_id: &str,
        to: SwapStatus,
        actor: &str,
    ) -> Result<TransitionOutcome, TransitionError> {
        let mut backoff = self.retry.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let swap = self
                .swaps
                .get(swap_id)
                .await?
                .ok_or_else(|| TransitionError::NotFound(swap_id.to_string()))?;

            if let Err(err) = check_transition(&swap, to, actor, &self.policy) {
                debug!(swap_id = %swap_id, actor = %actor, error = %err, "transition rejected");
                return Err(err);
            }

            let from = swap.status;
            let update = self
                .swaps
                .update(
                    swap_id,
                    SwapGuard::status(from),
                    SwapChanges::status(to, current_timestamp()),
                )
                .await;

            match update {
                Ok(updated) => {
                    info!(
                        swap_id = %updated.id,
                        actor = %actor,
                        from = %from,
                        to = %to,
                        "swap transitioned"
                    );
                    let warnings = self.availability.apply(&updated, to).await;
                    return Ok(TransitionOutcome {
                        swap: updated,
                        warnings,
                    });
                }
                Err(err) if err.is_conflict() => {
                    if attempt >= self.retry.max_attempts {
                        return Err(TransitionError::Conflict {
                            swap_id: swap_id.to_string(),
                        });
                    }
                    debug!(swap_id = %swap_id, attempt = attempt, "transition conflicted, retrying");
                    tokio::time::sleep(backoff.next_delay()).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
