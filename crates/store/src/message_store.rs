use crate::StoreError;
use async_trait::async_trait;
use leafswap_types::SwapMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Message storage trait - can be implemented for different backends
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Store a new message
    async fn create(&self, message: &SwapMessage) -> Result<(), StoreError>;

    /// List messages for a swap, oldest first
    async fn list_for_swap(&self, swap_id: &str) -> Result<Vec<SwapMessage>, StoreError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE (for testing)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<HashMap<String, Vec<SwapMessage>>>>,
    fail_writes: AtomicBool,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with a backend error (for testing)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Total number of messages across swaps (for testing)
    pub fn len(&self) -> usize {
        self.messages.read().unwrap().values().map(Vec::len).sum()
    }

    /// Check if store is empty (for testing)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(&self, message: &SwapMessage) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }

        self.messages
            .write()
            .unwrap()
            .entry(message.swap_id.clone())
            .or_insert_with(Vec::new)
            .push(message.clone());
        Ok(())
    }

    async fn list_for_swap(&self, swap_id: &str) -> Result<Vec<SwapMessage>, StoreError> {
        let mut messages = self
            .messages
            .read()
            .unwrap()
            .get(swap_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}
