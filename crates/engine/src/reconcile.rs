use std::collections::HashSet;
use std::sync::Arc;

use leafswap_store::{PlantPatch, PlantStore, StoreError, SwapStore};
use leafswap_types::{ConsistencyWarning, Plant, Swap, SwapStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One detected divergence between a swap and its referenced plants
///
/// Status changes commit without a cross-store transaction, so a crashed or
/// failed side effect leaves plant state behind the swap record. Each
/// variant names the precise signature the audit matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Drift {
    /// An active swap references a plant that no longer exists
    MissingPlant { swap_id: String, plant_id: String },

    /// Plant availability contradicts what the swap status requires
    WrongAvailability {
        swap_id: String,
        plant_id: String,
        expected: bool,
    },

    /// A completed swap whose plant never reached the new owner
    OwnershipNotTransferred {
        swap_id: String,
        plant_id: String,
        expected_owner: String,
    },

    /// An active swap whose plant changed hands outside the swap
    ForeignOwner {
        swap_id: String,
        plant_id: String,
        expected_owner: String,
        found_owner: String,
    },
}

impl Drift {
    pub fn swap_id(&self) -> &str {
        match self {
            Drift::MissingPlant { swap_id, .. } => swap_id,
            Drift::WrongAvailability { swap_id, .. } => swap_id,
            Drift::OwnershipNotTransferred { swap_id, .. } => swap_id,
            Drift::ForeignOwner { swap_id, .. } => swap_id,
        }
    }

    pub fn plant_id(&self) -> &str {
        match self {
            Drift::MissingPlant { plant_id, .. } => plant_id,
            Drift::WrongAvailability { plant_id, .. } => plant_id,
            Drift::OwnershipNotTransferred { plant_id, .. } => plant_id,
            Drift::ForeignOwner { plant_id, .. } => plant_id,
        }
    }

    /// The plant write that repairs this drift, if one exists
    ///
    /// Missing plants and foreign owners have no safe automatic repair;
    /// they stay in the report for an operator.
    pub fn patch(&self) -> Option<(String, PlantPatch)> {
        match self {
            Drift::WrongAvailability {
                plant_id, expected, ..
            } => Some((plant_id.clone(), PlantPatch::available(*expected))),
            Drift::OwnershipNotTransferred {
                plant_id,
                expected_owner,
                ..
            } => Some((plant_id.clone(), PlantPatch::transfer_to(expected_owner.clone()))),
            Drift::MissingPlant { .. } | Drift::ForeignOwner { .. } => None,
        }
    }

    fn to_warning(&self, reason: String) -> Option<ConsistencyWarning> {
        match self {
            Drift::WrongAvailability {
                swap_id,
                plant_id,
                expected,
            } => Some(ConsistencyWarning::AvailabilityNotUpdated {
                swap_id: swap_id.clone(),
                plant_id: plant_id.clone(),
                wanted: *expected,
                reason,
            }),
            Drift::OwnershipNotTransferred {
                swap_id,
                plant_id,
                expected_owner,
            } => Some(ConsistencyWarning::OwnershipNotTransferred {
                swap_id: swap_id.clone(),
                plant_id: plant_id.clone(),
                new_owner: expected_owner.clone(),
                reason,
            }),
            Drift::MissingPlant { .. } | Drift::ForeignOwner { .. } => None,
        }
    }
}

/// Classify one swap against its referenced plants, without I/O
///
/// `reserved` holds every plant id referenced by a pending or accepted
/// swap; a rejected swap must not re-list a plant an active swap holds.
///
/// The audit is deliberately conservative around history: a completed
/// swap's plant that already reached its new owner is never touched, even
/// if re-listed or swapped onward since. Only the exact signature of an
/// unfinished side effect counts as drift.
pub fn classify_drift(
    swap: &Swap,
    sender_plant: Option<&Plant>,
    receiver_plant: Option<&Plant>,
    reserved: &HashSet<String>,
) -> Vec<Drift> {
    let mut drifts = Vec::new();

    // (plant id, record, owner the swap recorded, owner completion promises)
    let sides = [
        (
            &swap.sender_plant_id,
            sender_plant,
            &swap.sender_id,
            &swap.receiver_id,
        ),
        (
            &swap.receiver_plant_id,
            receiver_plant,
            &swap.receiver_id,
            &swap.sender_id,
        ),
    ];

    for (plant_id, plant, recorded_owner, promised_owner) in sides {
        match swap.status {
            SwapStatus::Pending | SwapStatus::Accepted => {
                let plant = match plant {
                    Some(plant) => plant,
                    None => {
                        drifts.push(Drift::MissingPlant {
                            swap_id: swap.id.clone(),
                            plant_id: plant_id.clone(),
                        });
                        continue;
                    }
                };

                if plant.owner_id != *recorded_owner {
                    drifts.push(Drift::ForeignOwner {
                        swap_id: swap.id.clone(),
                        plant_id: plant_id.clone(),
                        expected_owner: recorded_owner.clone(),
                        found_owner: plant.owner_id.clone(),
                    });
                    // Someone else's plant; its availability is theirs.
                    continue;
                }

                if plant.available {
                    drifts.push(Drift::WrongAvailability {
                        swap_id: swap.id.clone(),
                        plant_id: plant_id.clone(),
                        expected: false,
                    });
                }
            }
            SwapStatus::Completed => {
                // Drift only while the plant still sits with its pre-swap
                // owner. Anything past that point is later legitimate
                // activity.
                if let Some(plant) = plant {
                    if plant.owner_id == *recorded_owner {
                        drifts.push(Drift::OwnershipNotTransferred {
                            swap_id: swap.id.clone(),
                            plant_id: plant_id.clone(),
                            expected_owner: promised_owner.clone(),
                        });
                    }
                }
            }
            SwapStatus::Rejected => {
                // Rejection frees both plants, unless an active swap now
                // holds them or they changed hands since.
                if let Some(plant) = plant {
                    if plant.owner_id == *recorded_owner
                        && !plant.available
                        && !reserved.contains(plant_id)
                    {
                        drifts.push(Drift::WrongAvailability {
                            swap_id: swap.id.clone(),
                            plant_id: plant_id.clone(),
                            expected: true,
                        });
                    }
                }
            }
        }
    }

    drifts
}

/// Outcome of one repair run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Swaps the audit examined
    pub swaps_checked: usize,

    /// Every divergence found, repairable or not
    pub drifts: Vec<Drift>,

    /// Plant writes that landed
    pub repaired: usize,

    /// Repair attempts that failed
    pub warnings: Vec<ConsistencyWarning>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.drifts.is_empty()
    }

    /// Drifts with no automatic repair, left for an operator
    pub fn unrepairable(&self) -> usize {
        self.drifts.iter().filter(|d| d.patch().is_none()).count()
    }
}

/// Audits swap/plant consistency and re-applies missing side effects
///
/// The write path reports drift as warnings instead of rolling back; this
/// is the other half of that contract. Run it periodically or after a
/// warning to converge plant state with the committed swap statuses.
pub struct Reconciler<S, P> {
    swaps: Arc<S>,
    plants: Arc<P>,
}

impl<S, P> Reconciler<S, P>
where
    S: SwapStore,
    P: PlantStore,
{
    pub fn new(swaps: Arc<S>, plants: Arc<P>) -> Self {
        Self { swaps, plants }
    }

    /// Scan every swap and classify divergences, writing nothing
    pub async fn audit(&self) -> Result<Vec<Drift>, StoreError> {
        let (_, drifts) = self.scan().await?;
        Ok(drifts)
    }

    /// Audit, then re-apply the intended plant state for repairable drifts
    pub async fn repair(&self) -> Result<ReconcileReport, StoreError> {
        let (swaps_checked, drifts) = self.scan().await?;
        info!(
            swaps_checked,
            drifts = drifts.len(),
            "reconciliation audit complete"
        );

        let mut repairable: Vec<(&Drift, (String, PlantPatch))> = Vec::new();
        for drift in &drifts {
            if let Some(patch) = drift.patch() {
                repairable.push((drift, patch));
            }
        }

        let mut repaired = 0;
        let mut warnings = Vec::new();
        if !repairable.is_empty() {
            let batch: Vec<(String, PlantPatch)> =
                repairable.iter().map(|(_, patch)| patch.clone()).collect();
            let results = self.plants.update_batch(&batch).await;

            for ((drift, _), (plant_id, result)) in repairable.iter().zip(results) {
                match result {
                    Ok(_) => repaired += 1,
                    Err(err) => {
                        warn!(
                            plant_id = %plant_id,
                            swap_id = %drift.swap_id(),
                            error = %err,
                            "drift repair failed"
                        );
                        if let Some(warning) = drift.to_warning(err.to_string()) {
                            warnings.push(warning);
                        }
                    }
                }
            }
        }

        if repaired > 0 {
            info!(repaired, "reconciliation repaired plant records");
        }

        Ok(ReconcileReport {
            swaps_checked,
            drifts,
            repaired,
            warnings,
        })
    }

    async fn scan(&self) -> Result<(usize, Vec<Drift>), StoreError> {
        let mut swaps = self.swaps.list_by_status(SwapStatus::Pending).await?;
        swaps.extend(self.swaps.list_by_status(SwapStatus::Accepted).await?);

        let reserved: HashSet<String> = swaps
            .iter()
            .flat_map(|s| s.plant_ids())
            .map(str::to_string)
            .collect();

        swaps.extend(self.swaps.list_by_status(SwapStatus::Completed).await?);
        swaps.extend(self.swaps.list_by_status(SwapStatus::Rejected).await?);

        let mut drifts = Vec::new();
        for swap in &swaps {
            let sender_plant = self.plants.get(&swap.sender_plant_id).await?;
            let receiver_plant = self.plants.get(&swap.receiver_plant_id).await?;
            drifts.extend(classify_drift(
                swap,
                sender_plant.as_ref(),
                receiver_plant.as_ref(),
                &reserved,
            ));
        }

        Ok((swaps.len(), drifts))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
