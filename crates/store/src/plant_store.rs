use crate::StoreError;
use async_trait::async_trait;
use leafswap_types::Plant;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Fields a plant update writes; unset fields stay untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantPatch {
    pub owner_id: Option<String>,
    pub available: Option<bool>,
}

impl PlantPatch {
    /// Flip only the availability flag
    pub fn available(value: bool) -> Self {
        Self {
            owner_id: None,
            available: Some(value),
        }
    }

    /// Hand the plant to a new owner and take it off the market
    pub fn transfer_to(new_owner: impl Into<String>) -> Self {
        Self {
            owner_id: Some(new_owner.into()),
            available: Some(false),
        }
    }

    pub fn apply(&self, plant: &mut Plant) {
        if let Some(owner_id) = &self.owner_id {
            plant.owner_id = owner_id.clone();
        }
        if let Some(available) = self.available {
            plant.available = available;
        }
    }
}

/// Plant storage trait - can be implemented for different backends
///
/// Listing and unlisting plants is someone else's job; the engine only
/// reads plants and patches `owner_id`/`available`. Batch updates return
/// per-id results because partial success is the expected failure mode of a
/// store without cross-record transactions.
#[async_trait]
pub trait PlantStore: Send + Sync {
    /// Get plant by ID
    async fn get(&self, id: &str) -> Result<Option<Plant>, StoreError>;

    /// List all plants owned by a participant
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Plant>, StoreError>;

    /// List plants a participant could offer right now
    async fn list_available_by_owner(&self, owner_id: &str) -> Result<Vec<Plant>, StoreError>;

    /// Patch a single plant, returning the stored record
    async fn update(&self, id: &str, patch: PlantPatch) -> Result<Plant, StoreError>;

    /// Patch several plants, one result per id, partial success possible
    async fn update_batch(
        &self,
        updates: &[(String, PlantPatch)],
    ) -> Vec<(String, Result<Plant, StoreError>)>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE (for testing)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct InMemoryPlantStore {
    plants: Arc<RwLock<HashMap<String, Plant>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryPlantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a plant (for testing)
    pub fn insert(&self, plant: Plant) {
        self.plants.write().unwrap().insert(plant.id.clone(), plant);
    }

    /// Make every write against this plant fail with a backend error
    /// (for testing)
    pub fn fail_writes_for(&self, id: impl Into<String>) {
        self.failing.write().unwrap().insert(id.into());
    }

    /// Clear injected failures (for testing)
    pub fn clear_failures(&self) {
        self.failing.write().unwrap().clear();
    }

    /// Get number of plants (for testing)
    pub fn len(&self) -> usize {
        self.plants.read().unwrap().len()
    }

    /// Check if store is empty (for testing)
    pub fn is_empty(&self) -> bool {
        self.plants.read().unwrap().is_empty()
    }

    fn write_one(&self, id: &str, patch: &PlantPatch) -> Result<Plant, StoreError> {
        if self.failing.read().unwrap().contains(id) {
            return Err(StoreError::Backend(format!(
                "injected write failure for {id}"
            )));
        }

        let mut plants = self.plants.write().unwrap();
        let plant = plants
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply(plant);
        Ok(plant.clone())
    }
}

#[async_trait]
impl PlantStore for InMemoryPlantStore {
    async fn get(&self, id: &str) -> Result<Option<Plant>, StoreError> {
        Ok(self.plants.read().unwrap().get(id).cloned())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Plant>, StoreError> {
        let plants = self.plants.read().unwrap();
        let mut results: Vec<_> = plants
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();

        results.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(results)
    }

    async fn list_available_by_owner(&self, owner_id: &str) -> Result<Vec<Plant>, StoreError> {
        let plants = self.plants.read().unwrap();
        let mut results: Vec<_> = plants
            .values()
            .filter(|p| p.owner_id == owner_id && p.available)
            .cloned()
            .collect();

        results.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(results)
    }

    async fn update(&self, id: &str, patch: PlantPatch) -> Result<Plant, StoreError> {
        self.write_one(id, &patch)
    }

    async fn update_batch(
        &self,
        updates: &[(String, PlantPatch)],
    ) -> Vec<(String, Result<Plant, StoreError>)> {
        updates
            .iter()
            .map(|(id, patch)| (id.clone(), self.write_one(id, patch)))
            .collect()
    }
}
