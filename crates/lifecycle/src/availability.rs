use leafswap_store::{PlantPatch, PlantStore};
use leafswap_types::{ConsistencyWarning, Swap, SwapStatus};
use std::sync::Arc;
use tracing::warn;

/// Keeps plant availability flags consistent with swap status
///
/// The mapping itself lives on `SwapStatus::plants_available_after` as one
/// exhaustive match. This component applies it to both referenced plants
/// through the batch endpoint and turns every per-plant failure into a
/// `ConsistencyWarning`. It never fails the surrounding operation and never
/// rolls the swap write back; the swap store is the source of truth and
/// plant flags trail it.
pub struct AvailabilitySync<P> {
    plants: Arc<P>,
}

impl<P> Clone for AvailabilitySync<P> {
    fn clone(&self) -> Self {
        Self {
            plants: Arc::clone(&self.plants),
        }
    }
}

impl<P: PlantStore> AvailabilitySync<P> {
    pub fn new(plants: Arc<P>) -> Self {
        Self { plants }
    }

    /// Align both referenced plants with what `status` requires
    pub async fn apply(&self, swap: &Swap, status: SwapStatus) -> Vec<ConsistencyWarning> {
        self.set_availability(swap, status.plants_available_after())
            .await
    }

    /// Flip both referenced plants to `wanted`, collecting partial failures
    pub async fn set_availability(&self, swap: &Swap, wanted: bool) -> Vec<ConsistencyWarning> {
        let updates: Vec<(String, PlantPatch)> = swap
            .plant_ids()
            .iter()
            .map(|id| (id.to_string(), PlantPatch::available(wanted)))
            .collect();

        let mut warnings = Vec::new();
        for (plant_id, result) in self.plants.update_batch(&updates).await {
            if let Err(err) = result {
                warn!(
                    swap_id = %swap.id,
                    plant_id = %plant_id,
                    wanted = wanted,
                    error = %err,
                    "plant availability update failed"
                );
                warnings.push(ConsistencyWarning::AvailabilityNotUpdated {
                    swap_id: swap.id.clone(),
                    plant_id,
                    wanted,
                    reason: err.to_string(),
                });
            }
        }
        warnings
    }
}
