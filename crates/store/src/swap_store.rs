use crate::StoreError;
use async_trait::async_trait;
use leafswap_types::{Swap, SwapEvent, SwapRole, SwapStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Default capacity of the change feed behind `watch`
pub const DEFAULT_FEED_CAPACITY: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════
// CONDITIONAL UPDATE TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// Preconditions a swap update is keyed on
///
/// Every set field must equal the stored value or the update fails with
/// `Conflict` and writes nothing. Unset fields are unchecked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapGuard {
    pub status: Option<SwapStatus>,
    pub sender_completed: Option<bool>,
    pub receiver_completed: Option<bool>,
}

impl SwapGuard {
    /// Guard on the current status only
    pub fn status(status: SwapStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_completed_by(mut self, role: SwapRole, value: bool) -> Self {
        match role {
            SwapRole::Sender => self.sender_completed = Some(value),
            SwapRole::Receiver => self.receiver_completed = Some(value),
        }
        self
    }

    /// Check the guard against a stored record, reporting the first mismatch
    pub fn check(&self, swap: &Swap) -> Result<(), String> {
        if let Some(expected) = self.status {
            if swap.status != expected {
                return Err(format!(
                    "status is {}, expected {}",
                    swap.status, expected
                ));
            }
        }
        if let Some(expected) = self.sender_completed {
            if swap.sender_completed != expected {
                return Err(format!(
                    "sender_completed is {}, expected {}",
                    swap.sender_completed, expected
                ));
            }
        }
        if let Some(expected) = self.receiver_completed {
            if swap.receiver_completed != expected {
                return Err(format!(
                    "receiver_completed is {}, expected {}",
                    swap.receiver_completed, expected
                ));
            }
        }
        Ok(())
    }
}

/// Fields a swap update writes; unset fields stay untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapChanges {
    pub status: Option<SwapStatus>,
    pub sender_completed: Option<bool>,
    pub receiver_completed: Option<bool>,
    pub updated_at: Option<u64>,
}

impl SwapChanges {
    pub fn status(status: SwapStatus, updated_at: u64) -> Self {
        Self {
            status: Some(status),
            updated_at: Some(updated_at),
            ..Self::default()
        }
    }

    pub fn completed_by(role: SwapRole, updated_at: u64) -> Self {
        let mut changes = Self {
            updated_at: Some(updated_at),
            ..Self::default()
        };
        match role {
            SwapRole::Sender => changes.sender_completed = Some(true),
            SwapRole::Receiver => changes.receiver_completed = Some(true),
        }
        changes
    }

    pub fn apply(&self, swap: &mut Swap) {
        if let Some(status) = self.status {
            swap.status = status;
        }
        if let Some(value) = self.sender_completed {
            swap.sender_completed = value;
        }
        if let Some(value) = self.receiver_completed {
            swap.receiver_completed = value;
        }
        if let Some(updated_at) = self.updated_at {
            swap.updated_at = updated_at;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.sender_completed.is_none()
            && self.receiver_completed.is_none()
            && self.updated_at.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════

/// Swap storage trait - can be implemented for different backends
///
/// Writes are conditional: `update` takes a guard describing the state the
/// caller read, so lost updates surface as `Conflict` instead of silently
/// overwriting. Committed writes appear on the `watch` feed.
#[async_trait]
pub trait SwapStore: Send + Sync {
    /// Store a new swap
    async fn create(&self, swap: &Swap) -> Result<(), StoreError>;

    /// Get swap by ID
    async fn get(&self, id: &str) -> Result<Option<Swap>, StoreError>;

    /// List swaps where the participant is sender or receiver, newest first
    async fn list_for_participant(&self, participant_id: &str) -> Result<Vec<Swap>, StoreError>;

    /// List swaps by status, newest first
    async fn list_by_status(&self, status: SwapStatus) -> Result<Vec<Swap>, StoreError>;

    /// Conditionally update a swap, returning the stored record
    async fn update(
        &self,
        id: &str,
        guard: SwapGuard,
        changes: SwapChanges,
    ) -> Result<Swap, StoreError>;

    /// Subscribe to committed writes on this store
    fn watch(&self) -> broadcast::Receiver<SwapEvent>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE (for testing)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct InMemorySwapStore {
    swaps: Arc<RwLock<HashMap<String, Swap>>>,
    events: broadcast::Sender<SwapEvent>,
}

impl InMemorySwapStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Create a store whose change feed buffers `capacity` events per
    /// subscriber before lagging
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            swaps: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    /// Get number of swaps (for testing)
    pub fn len(&self) -> usize {
        self.swaps.read().unwrap().len()
    }

    /// Check if store is empty (for testing)
    pub fn is_empty(&self) -> bool {
        self.swaps.read().unwrap().is_empty()
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        self.swaps.write().unwrap().clear();
    }

    fn publish(&self, event: SwapEvent) {
        // No live subscribers is fine; the feed is advisory
        let _ = self.events.send(event);
    }
}

impl Default for InMemorySwapStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwapStore for InMemorySwapStore {
    async fn create(&self, swap: &Swap) -> Result<(), StoreError> {
        {
            let mut swaps = self.swaps.write().unwrap();
            if swaps.contains_key(&swap.id) {
                return Err(StoreError::DuplicateId(swap.id.clone()));
            }
            swaps.insert(swap.id.clone(), swap.clone());
        }
        self.publish(SwapEvent::created(swap.clone()));
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Swap>, StoreError> {
        Ok(self.swaps.read().unwrap().get(id).cloned())
    }

    async fn list_for_participant(&self, participant_id: &str) -> Result<Vec<Swap>, StoreError> {
        let swaps = self.swaps.read().unwrap();
        let mut results: Vec<_> = swaps
            .values()
            .filter(|s| s.is_participant(participant_id))
            .cloned()
            .collect();

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(results)
    }

    async fn list_by_status(&self, status: SwapStatus) -> Result<Vec<Swap>, StoreError> {
        let swaps = self.swaps.read().unwrap();
        let mut results: Vec<_> = swaps
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect();

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(results)
    }

    async fn update(
        &self,
        id: &str,
        guard: SwapGuard,
        changes: SwapChanges,
    ) -> Result<Swap, StoreError> {
        let updated = {
            let mut swaps = self.swaps.write().unwrap();
            let swap = swaps
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            guard.check(swap).map_err(|reason| StoreError::Conflict {
                id: id.to_string(),
                reason,
            })?;

            changes.apply(swap);
            swap.clone()
        };
        self.publish(SwapEvent::updated(updated.clone()));
        Ok(updated)
    }

    fn watch(&self) -> broadcast::Receiver<SwapEvent> {
        self.events.subscribe()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
