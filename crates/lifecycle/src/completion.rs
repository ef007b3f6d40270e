use crate::{current_timestamp, RetryPolicy};
use leafswap_store::{PlantPatch, PlantStore, StoreError, SwapChanges, SwapGuard, SwapStore};
use leafswap_types::{ConsistencyWarning, Swap, SwapStatus};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("swap not found: {0}")]
    NotFound(String),

    #[error("swap {swap_id}: {actor} is not a participant")]
    NotParticipant { swap_id: String, actor: String },

    #[error("swap {swap_id}: completion requires an accepted swap, status is {status}")]
    NotAccepted {
        swap_id: String,
        status: SwapStatus,
    },

    #[error("swap {swap_id}: confirmation lost to concurrent writes, retries exhausted")]
    Conflict { swap_id: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of one confirmation call
#[derive(Debug)]
pub struct CompletionOutcome {
    pub swap: Swap,

    /// Whether this call closed the handshake and ran the ownership
    /// transfer (false while waiting on the other side, and for idempotent
    /// replays after completion)
    pub newly_completed: bool,

    pub warnings: Vec<ConsistencyWarning>,
}

/// Two-party completion handshake
///
/// This is the only path to `completed` and to ownership transfer. Each
/// participant records their own confirmation; the write that observes both
/// flags promotes the swap through a status guard only one writer can win,
/// so the transfer runs exactly once however many confirmations race.
pub struct CompletionCoordinator<S, P> {
    swaps: Arc<S>,
    plants: Arc<P>,
    retry: RetryPolicy,
}

impl<S, P> CompletionCoordinator<S, P>
where
    S: SwapStore,
    P: PlantStore,
{
    pub fn new(swaps: Arc<S>, plants: Arc<P>, retry: RetryPolicy) -> Self {
        Self {
            swaps,
            plants,
            retry,
        }
    }

    /// Record `actor`'s confirmation that the physical exchange happened
    ///
    /// Idempotent per actor: re-confirming changes nothing and succeeds,
    /// including after the swap completed.
    pub async fn confirm(
        &self,
        swap_id: &str,
        actor: &str,
    ) -> Result<CompletionOutcome, CompletionError> {
        let mut backoff = self.retry.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let swap = self
                .swaps
                .get(swap_id)
                .await?
                .ok_or_else(|| CompletionError::NotFound(swap_id.to_string()))?;

            let role = swap
                .role_of(actor)
                .ok_or_else(|| CompletionError::NotParticipant {
                    swap_id: swap_id.to_string(),
                    actor: actor.to_string(),
                })?;

            match swap.status {
                SwapStatus::Accepted => {}
                // Replayed confirmation after the handshake closed
                SwapStatus::Completed if swap.completed_by(role) => {
                    return Ok(CompletionOutcome {
                        swap,
                        newly_completed: false,
                        warnings: Vec::new(),
                    });
                }
                status => {
                    return Err(CompletionError::NotAccepted {
                        swap_id: swap_id.to_string(),
                        status,
                    });
                }
            }

            // Record this participant's confirmation. A re-confirm skips the
            // write; a crashed earlier call then still reaches finalization
            // below instead of leaving the swap stuck with two flags set.
            let swap = if swap.completed_by(role) {
                swap
            } else {
                let guard = SwapGuard::status(SwapStatus::Accepted).with_completed_by(role, false);
                let changes = SwapChanges::completed_by(role, current_timestamp());
                match self.swaps.update(swap_id, guard, changes).await {
                    Ok(updated) => {
                        info!(
                            swap_id = %swap_id,
                            actor = %actor,
                            role = ?role,
                            "completion confirmed"
                        );
                        updated
                    }
                    Err(err) if err.is_conflict() => {
                        // The other side's confirmation or a cancellation
                        // landed since we read; refetch and re-evaluate
                        if attempt >= self.retry.max_attempts {
                            return Err(CompletionError::Conflict {
                                swap_id: swap_id.to_string(),
                            });
                        }
                        debug!(swap_id = %swap_id, attempt = attempt, "confirmation conflicted, retrying");
                        tokio::time::sleep(backoff.next_delay()).await;
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                }
            };

            if !swap.both_completed() {
                return Ok(CompletionOutcome {
                    swap,
                    newly_completed: false,
                    warnings: Vec::new(),
                });
            }

            return self.finalize(swap_id).await;
        }
    }

    /// Promote an accepted swap with both flags set to completed and swap
    /// plant ownership; exactly one racing caller gets `newly_completed`
    async fn finalize(&self, swap_id: &str) -> Result<CompletionOutcome, CompletionError> {
        let promote = self
            .swaps
            .update(
                swap_id,
                SwapGuard::status(SwapStatus::Accepted),
                SwapChanges::status(SwapStatus::Completed, current_timestamp()),
            )
            .await;

        match promote {
            Ok(completed) => {
                let warnings = self.transfer_ownership(&completed).await;
                info!(
                    swap_id = %completed.id,
                    sender = %completed.sender_id,
                    receiver = %completed.receiver_id,
                    warnings = warnings.len(),
                    "swap completed, plant ownership transferred"
                );
                Ok(CompletionOutcome {
                    swap: completed,
                    newly_completed: true,
                    warnings,
                })
            }
            Err(err) if err.is_conflict() => {
                // Another confirmation finalized first, or the swap was
                // cancelled between our flag write and now
                let current = self
                    .swaps
                    .get(swap_id)
                    .await?
                    .ok_or_else(|| CompletionError::NotFound(swap_id.to_string()))?;

                if current.status == SwapStatus::Completed {
                    Ok(CompletionOutcome {
                        swap: current,
                        newly_completed: false,
                        warnings: Vec::new(),
                    })
                } else {
                    Err(CompletionError::NotAccepted {
                        swap_id: swap_id.to_string(),
                        status: current.status,
                    })
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Hand each plant to its new owner, off the market
    ///
    /// The swap is already completed when this runs; failures leave stale
    /// ownership for reconciliation to repair, never a rollback.
    async fn transfer_ownership(&self, swap: &Swap) -> Vec<ConsistencyWarning> {
        let transfers = [
            (swap.sender_plant_id.clone(), swap.receiver_id.clone()),
            (swap.receiver_plant_id.clone(), swap.sender_id.clone()),
        ];
        let updates: Vec<(String, PlantPatch)> = transfers
            .iter()
            .map(|(plant_id, new_owner)| {
                (plant_id.clone(), PlantPatch::transfer_to(new_owner.clone()))
            })
            .collect();

        let mut warnings = Vec::new();
        for ((plant_id, result), (_, new_owner)) in self
            .plants
            .update_batch(&updates)
            .await
            .into_iter()
            .zip(transfers.iter())
        {
            if let Err(err) = result {
                warn!(
                    swap_id = %swap.id,
                    plant_id = %plant_id,
                    new_owner = %new_owner,
                    error = %err,
                    "ownership transfer failed for plant"
                );
                warnings.push(ConsistencyWarning::OwnershipNotTransferred {
                    swap_id: swap.id.clone(),
                    plant_id,
                    new_owner: new_owner.clone(),
                    reason: err.to_string(),
                });
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafswap_store::{InMemoryPlantStore, InMemorySwapStore};
    use leafswap_types::Plant;

    async fn setup(
        status: SwapStatus,
    ) -> (
        CompletionCoordinator<InMemorySwapStore, InMemoryPlantStore>,
        Arc<InMemorySwapStore>,
        Arc<InMemoryPlantStore>,
    ) {
        let swaps = Arc::new(InMemorySwapStore::new());
        let plants = Arc::new(InMemoryPlantStore::new());

        let mut plant_a = Plant::new("plant-a", "alice", "fern", 1000);
        plant_a.available = false;
        let mut plant_b = Plant::new("plant-b", "bob", "monstera", 1000);
        plant_b.available = false;
        plants.insert(plant_a);
        plants.insert(plant_b);

        let mut swap = Swap::new("swap-1", "alice", "bob", "plant-a", "plant-b", None, 1000);
        swap.status = status;
        swaps.create(&swap).await.unwrap();

        let coordinator =
            CompletionCoordinator::new(swaps.clone(), plants.clone(), RetryPolicy::default());
        (coordinator, swaps, plants)
    }

    #[tokio::test]
    async fn test_first_confirmation_waits_for_other_side() {
        let (coordinator, swaps, plants) = setup(SwapStatus::Accepted).await;

        let outcome = coordinator.confirm("swap-1", "alice").await.unwrap();
        assert!(!outcome.newly_completed);
        assert!(outcome.swap.sender_completed);
        assert!(!outcome.swap.receiver_completed);
        assert_eq!(outcome.swap.status, SwapStatus::Accepted);

        // No ownership movement yet
        let stored = swaps.get("swap-1").await.unwrap().unwrap();
        assert_eq!(stored.status, SwapStatus::Accepted);
        assert_eq!(plants.get("plant-a").await.unwrap().unwrap().owner_id, "alice");
    }

    #[tokio::test]
    async fn test_second_confirmation_completes_and_transfers() {
        let (coordinator, swaps, plants) = setup(SwapStatus::Accepted).await;

        coordinator.confirm("swap-1", "alice").await.unwrap();
        let outcome = coordinator.confirm("swap-1", "bob").await.unwrap();

        assert!(outcome.newly_completed);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.swap.status, SwapStatus::Completed);

        let stored = swaps.get("swap-1").await.unwrap().unwrap();
        assert_eq!(stored.status, SwapStatus::Completed);

        // Ownership crossed, both plants off the market
        let plant_a = plants.get("plant-a").await.unwrap().unwrap();
        let plant_b = plants.get("plant-b").await.unwrap().unwrap();
        assert_eq!(plant_a.owner_id, "bob");
        assert_eq!(plant_b.owner_id, "alice");
        assert!(!plant_a.available);
        assert!(!plant_b.available);
    }

    #[tokio::test]
    async fn test_confirm_is_idempotent_per_actor() {
        let (coordinator, _, _) = setup(SwapStatus::Accepted).await;

        let first = coordinator.confirm("swap-1", "alice").await.unwrap();
        let second = coordinator.confirm("swap-1", "alice").await.unwrap();

        assert_eq!(first.swap.sender_completed, second.swap.sender_completed);
        assert!(!second.newly_completed);
        assert_eq!(second.swap.status, SwapStatus::Accepted);
    }

    #[tokio::test]
    async fn test_replay_after_completion_is_a_quiet_success() {
        let (coordinator, _swaps, plants) = setup(SwapStatus::Accepted).await;
        coordinator.confirm("swap-1", "alice").await.unwrap();
        coordinator.confirm("swap-1", "bob").await.unwrap();

        let replay = coordinator.confirm("swap-1", "alice").await.unwrap();
        assert!(!replay.newly_completed);
        assert_eq!(replay.swap.status, SwapStatus::Completed);

        // Transfer did not run twice
        assert_eq!(plants.get("plant-a").await.unwrap().unwrap().owner_id, "bob");
    }

    #[tokio::test]
    async fn test_confirm_on_pending_is_a_precondition_failure() {
        let (coordinator, swaps, _) = setup(SwapStatus::Pending).await;

        let result = coordinator.confirm("swap-1", "alice").await;
        assert!(matches!(
            result,
            Err(CompletionError::NotAccepted {
                status: SwapStatus::Pending,
                ..
            })
        ));

        let stored = swaps.get("swap-1").await.unwrap().unwrap();
        assert!(!stored.sender_completed);
    }

    #[tokio::test]
    async fn test_non_participant_cannot_confirm() {
        let (coordinator, _, _) = setup(SwapStatus::Accepted).await;
        let result = coordinator.confirm("swap-1", "mallory").await;
        assert!(matches!(result, Err(CompletionError::NotParticipant { .. })));
    }

    #[tokio::test]
    async fn test_missing_swap() {
        let (coordinator, _, _) = setup(SwapStatus::Accepted).await;
        let result = coordinator.confirm("ghost", "alice").await;
        assert!(matches!(result, Err(CompletionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_confirmations_transfer_exactly_once() {
        let (coordinator, swaps, plants) = setup(SwapStatus::Accepted).await;
        let coordinator = Arc::new(coordinator);

        let a = {
            let c = Arc::clone(&coordinator);
            tokio::spawn(async move { c.confirm("swap-1", "alice").await })
        };
        let b = {
            let c = Arc::clone(&coordinator);
            tokio::spawn(async move { c.confirm("swap-1", "bob").await })
        };

        let outcome_a = a.await.unwrap().unwrap();
        let outcome_b = b.await.unwrap().unwrap();

        // At most one side observed the finalization; never both
        assert!(
            !(outcome_a.newly_completed && outcome_b.newly_completed),
            "both confirmations claimed the finalization"
        );

        let stored = swaps.get("swap-1").await.unwrap().unwrap();
        assert_eq!(stored.status, SwapStatus::Completed);
        assert!(stored.both_completed());

        // A double transfer would hand the plants back to their original
        // owners; crossed ownership proves it ran once
        assert_eq!(plants.get("plant-a").await.unwrap().unwrap().owner_id, "bob");
        assert_eq!(plants.get("plant-b").await.unwrap().unwrap().owner_id, "alice");
    }

    #[tokio::test]
    async fn test_transfer_failure_surfaces_warning_and_keeps_completion() {
        let (coordinator, swaps, plants) = setup(SwapStatus::Accepted).await;
        plants.fail_writes_for("plant-b");

        coordinator.confirm("swap-1", "alice").await.unwrap();
        let outcome = coordinator.confirm("swap-1", "bob").await.unwrap();

        assert!(outcome.newly_completed);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            &outcome.warnings[0],
            ConsistencyWarning::OwnershipNotTransferred { plant_id, new_owner, .. }
                if plant_id == "plant-b" && new_owner == "alice"
        ));

        // The status write stands; only plant-b's ownership is stale
        let stored = swaps.get("swap-1").await.unwrap().unwrap();
        assert_eq!(stored.status, SwapStatus::Completed);
        assert_eq!(plants.get("plant-a").await.unwrap().unwrap().owner_id, "bob");
        assert_eq!(plants.get("plant-b").await.unwrap().unwrap().owner_id, "bob");
    }

    #[tokio::test]
    async fn test_stuck_handshake_heals_on_replay() {
        // Both flags set but still accepted, as if a finalize crashed
        let (coordinator, swaps, plants) = setup(SwapStatus::Accepted).await;
        let mut stuck = swaps.get("swap-1").await.unwrap().unwrap();
        stuck.sender_completed = true;
        stuck.receiver_completed = true;
        swaps.clear();
        swaps.create(&stuck).await.unwrap();

        let outcome = coordinator.confirm("swap-1", "alice").await.unwrap();
        assert!(outcome.newly_completed);
        assert_eq!(outcome.swap.status, SwapStatus::Completed);
        assert_eq!(plants.get("plant-a").await.unwrap().unwrap().owner_id, "bob");
    }
}
