use std::collections::HashMap;
use std::sync::Arc;

use leafswap_lifecycle::{
    CompletionCoordinator, CompletionError, CompletionOutcome, ProposalError, ProposalFactory,
    ProposalOutcome, ProposalRequest, SwapStateMachine, TransitionError, TransitionOutcome,
};
use leafswap_notify::{SwapEventStream, SwapFilter, SwapSubscription};
use leafswap_store::{MessageStore, PlantStore, StoreError, SwapStore};
use leafswap_types::{PlantSummary, Swap, SwapActions, SwapDetails, SwapStatistics, SwapStatus};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::reconcile::Reconciler;

/// Error from the engine's read-side queries
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("swap not found: {0}")]
    SwapNotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Facade over the swap lifecycle
///
/// Owns one of each lifecycle component wired to the same stores, exposes
/// the write operations, the read-side views the presentation layer needs,
/// and subscriptions over the store's change feed. All consistency
/// trade-offs live in the components; the facade only routes and logs.
pub struct SwapEngine<S, P, M> {
    swaps: Arc<S>,
    plants: Arc<P>,
    proposals: ProposalFactory<S, P, M>,
    state_machine: SwapStateMachine<S, P>,
    completion: CompletionCoordinator<S, P>,
    config: EngineConfig,
}

impl<S, P, M> SwapEngine<S, P, M>
where
    S: SwapStore,
    P: PlantStore,
    M: MessageStore,
{
    pub fn new(swaps: Arc<S>, plants: Arc<P>, messages: Arc<M>, config: EngineConfig) -> Self {
        let proposals =
            ProposalFactory::new(Arc::clone(&swaps), Arc::clone(&plants), messages);
        let state_machine = SwapStateMachine::new(
            Arc::clone(&swaps),
            Arc::clone(&plants),
            config.policy,
            config.retry,
        );
        let completion =
            CompletionCoordinator::new(Arc::clone(&swaps), Arc::clone(&plants), config.retry);

        Self {
            swaps,
            plants,
            proposals,
            state_machine,
            completion,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A reconciler over the same stores, for drift audits and repair
    pub fn reconciler(&self) -> Reconciler<S, P> {
        Reconciler::new(Arc::clone(&self.swaps), Arc::clone(&self.plants))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WRITE PATH
    // ═══════════════════════════════════════════════════════════════════════════

    /// Propose a new swap
    pub async fn propose(
        &self,
        request: ProposalRequest,
    ) -> Result<ProposalOutcome, ProposalError> {
        info!(
            sender_id = %request.sender_id,
            target_plant_id = %request.target_plant_id,
            "processing swap proposal"
        );

        match self.proposals.propose(request).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                debug!(error = %err, "proposal rejected");
                Err(err)
            }
        }
    }

    /// Move a swap to a new status on behalf of `actor`
    pub async fn transition(
        &self,
        swap_id: &str,
        to: SwapStatus,
        actor: &str,
    ) -> Result<TransitionOutcome, TransitionError> {
        info!(swap_id = %swap_id, to = %to, actor = %actor, "processing transition");

        match self.state_machine.transition(swap_id, to, actor).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                debug!(swap_id = %swap_id, error = %err, "transition rejected");
                Err(err)
            }
        }
    }

    /// Record `actor`'s confirmation that the physical exchange happened
    pub async fn confirm_completion(
        &self,
        swap_id: &str,
        actor: &str,
    ) -> Result<CompletionOutcome, CompletionError> {
        info!(swap_id = %swap_id, actor = %actor, "processing completion confirmation");

        match self.completion.confirm(swap_id, actor).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                debug!(swap_id = %swap_id, error = %err, "confirmation rejected");
                Err(err)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SUBSCRIPTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Subscribe to committed writes on swaps involving `participant_id`
    pub fn subscribe(&self, participant_id: impl Into<String>) -> SwapSubscription {
        SwapSubscription::new(self.swaps.watch(), SwapFilter::Participant(participant_id.into()))
    }

    /// Subscribe to every committed swap write
    pub fn subscribe_all(&self) -> SwapSubscription {
        SwapSubscription::new(self.swaps.watch(), SwapFilter::All)
    }

    /// Subscribe to committed writes on one swap
    pub fn watch_swap(&self, swap_id: impl Into<String>) -> SwapSubscription {
        SwapSubscription::new(self.swaps.watch(), SwapFilter::Swap(swap_id.into()))
    }

    /// `Stream` adapter over the change feed for the given filter
    pub fn event_stream(&self, filter: SwapFilter) -> SwapEventStream {
        SwapEventStream::new(self.swaps.watch(), filter)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // READ PATH
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fetch one swap record
    pub async fn swap(&self, swap_id: &str) -> Result<Option<Swap>, EngineError> {
        Ok(self.swaps.get(swap_id).await?)
    }

    /// A participant's swaps, newest first, joined with plant summaries
    ///
    /// Plants deleted since the swap was recorded come back as `None`
    /// rather than failing the whole listing.
    pub async fn swaps_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<SwapDetails>, EngineError> {
        let swaps = self.swaps.list_for_participant(participant_id).await?;

        let mut cache: HashMap<String, Option<PlantSummary>> = HashMap::new();
        let mut details = Vec::with_capacity(swaps.len());
        for swap in swaps {
            let sender_plant = self.plant_summary(&mut cache, &swap.sender_plant_id).await?;
            let receiver_plant = self
                .plant_summary(&mut cache, &swap.receiver_plant_id)
                .await?;
            details.push(SwapDetails {
                swap,
                sender_plant,
                receiver_plant,
            });
        }
        Ok(details)
    }

    /// Status counts over a participant's swaps
    pub async fn statistics_for(
        &self,
        participant_id: &str,
    ) -> Result<SwapStatistics, EngineError> {
        let swaps = self.swaps.list_for_participant(participant_id).await?;
        Ok(SwapStatistics::from_swaps(&swaps))
    }

    /// What `participant_id` may currently do with one swap
    pub async fn actions_for(
        &self,
        swap_id: &str,
        participant_id: &str,
    ) -> Result<SwapActions, EngineError> {
        let swap = self
            .swaps
            .get(swap_id)
            .await?
            .ok_or_else(|| EngineError::SwapNotFound(swap_id.to_string()))?;

        Ok(SwapActions::for_participant(
            &swap,
            participant_id,
            &self.config.policy,
        ))
    }

    async fn plant_summary(
        &self,
        cache: &mut HashMap<String, Option<PlantSummary>>,
        plant_id: &str,
    ) -> Result<Option<PlantSummary>, EngineError> {
        if let Some(cached) = cache.get(plant_id) {
            return Ok(cached.clone());
        }
        let summary = self
            .plants
            .get(plant_id)
            .await?
            .as_ref()
            .map(PlantSummary::from);
        cache.insert(plant_id.to_string(), summary.clone());
        Ok(summary)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use leafswap_store::{InMemoryMessageStore, InMemoryPlantStore, InMemorySwapStore};
    use leafswap_types::Plant;
    use std::time::Duration;
    use tokio::time::timeout;

    type TestEngine = SwapEngine<InMemorySwapStore, InMemoryPlantStore, InMemoryMessageStore>;

    fn create_test_engine() -> (TestEngine, Arc<InMemorySwapStore>, Arc<InMemoryPlantStore>) {
        let swaps = Arc::new(InMemorySwapStore::new());
        let plants = Arc::new(InMemoryPlantStore::new());
        let messages = Arc::new(InMemoryMessageStore::new());

        plants.insert(Plant::new("plant-a", "alice", "monstera", 1000));
        plants.insert(Plant::new("plant-b", "bob", "pothos", 1000));

        let engine = SwapEngine::new(
            Arc::clone(&swaps),
            Arc::clone(&plants),
            messages,
            EngineConfig::default(),
        );
        (engine, swaps, plants)
    }

    #[tokio::test]
    async fn test_propose_then_query_views() {
        let (engine, _swaps, _plants) = create_test_engine();

        let outcome = engine
            .propose(ProposalRequest::new("alice", "plant-a", "plant-b"))
            .await
            .unwrap();
        let swap_id = outcome.swap.id.clone();

        let fetched = engine.swap(&swap_id).await.unwrap().unwrap();
        assert_eq!(fetched.status, SwapStatus::Pending);

        let details = engine.swaps_for_participant("bob").await.unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].sender_plant.as_ref().unwrap().name, "monstera");
        assert_eq!(details[0].receiver_plant.as_ref().unwrap().name, "pothos");

        let stats = engine.statistics_for("alice").await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.pending, 1);

        let actions = engine.actions_for(&swap_id, "bob").await.unwrap();
        assert!(actions.can_accept);
        let actions = engine.actions_for(&swap_id, "alice").await.unwrap();
        assert!(!actions.any());
    }

    #[tokio::test]
    async fn test_subscription_sees_committed_writes() {
        let (engine, _swaps, _plants) = create_test_engine();
        let mut sub = engine.subscribe("bob");

        let outcome = engine
            .propose(ProposalRequest::new("alice", "plant-a", "plant-b"))
            .await
            .unwrap();

        let delivery = timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        let event = delivery.as_swap().unwrap();
        assert_eq!(event.swap.id, outcome.swap.id);
    }

    #[tokio::test]
    async fn test_watch_swap_ignores_other_swaps() {
        let (engine, _swaps, plants) = create_test_engine();
        plants.insert(Plant::new("plant-c", "carol", "fern", 1000));
        plants.insert(Plant::new("plant-d", "dave", "cactus", 1000));

        let first = engine
            .propose(ProposalRequest::new("alice", "plant-a", "plant-b"))
            .await
            .unwrap();
        let mut sub = engine.watch_swap(first.swap.id.clone());

        engine
            .propose(ProposalRequest::new("carol", "plant-c", "plant-d"))
            .await
            .unwrap();
        engine
            .transition(&first.swap.id, SwapStatus::Accepted, "bob")
            .await
            .unwrap();

        let delivery = timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        let event = delivery.as_swap().unwrap();
        assert_eq!(event.swap.id, first.swap.id);
        assert_eq!(event.swap.status, SwapStatus::Accepted);
    }

    #[tokio::test]
    async fn test_event_stream_yields_filtered_events() {
        use tokio_stream::StreamExt;

        let (engine, _swaps, plants) = create_test_engine();
        plants.insert(Plant::new("plant-c", "carol", "fern", 1000));
        plants.insert(Plant::new("plant-d", "dave", "cactus", 1000));

        let mut stream = engine.event_stream(SwapFilter::participant("carol"));

        engine
            .propose(ProposalRequest::new("alice", "plant-a", "plant-b"))
            .await
            .unwrap();
        let outcome = engine
            .propose(ProposalRequest::new("carol", "plant-c", "plant-d"))
            .await
            .unwrap();

        // Alice's swap is filtered out; the first yielded event is carol's.
        let delivery = timeout(Duration::from_millis(100), stream.next())
            .await
            .unwrap()
            .unwrap();
        let event = delivery.as_swap().unwrap();
        assert_eq!(event.swap.id, outcome.swap.id);
    }

    #[tokio::test]
    async fn test_full_lifecycle_through_facade() {
        let (engine, _swaps, plants) = create_test_engine();

        let outcome = engine
            .propose(ProposalRequest::new("alice", "plant-a", "plant-b"))
            .await
            .unwrap();
        let swap_id = outcome.swap.id.clone();

        engine
            .transition(&swap_id, SwapStatus::Accepted, "bob")
            .await
            .unwrap();

        let first = engine.confirm_completion(&swap_id, "alice").await.unwrap();
        assert!(!first.newly_completed);

        let second = engine.confirm_completion(&swap_id, "bob").await.unwrap();
        assert!(second.newly_completed);
        assert_eq!(second.swap.status, SwapStatus::Completed);
        assert!(second.warnings.is_empty());

        // Ownership crossed, both plants off the market.
        let plant_a = plants.get("plant-a").await.unwrap().unwrap();
        let plant_b = plants.get("plant-b").await.unwrap().unwrap();
        assert_eq!(plant_a.owner_id, "bob");
        assert_eq!(plant_b.owner_id, "alice");
        assert!(!plant_a.available);
        assert!(!plant_b.available);
    }

    #[tokio::test]
    async fn test_actions_for_unknown_swap_is_not_found() {
        let (engine, _swaps, _plants) = create_test_engine();

        let err = engine.actions_for("missing", "alice").await.unwrap_err();
        assert!(matches!(err, EngineError::SwapNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_listing_survives_deleted_plant() {
        let (engine, swaps, _plants) = create_test_engine();

        // A swap referencing a plant that no longer exists.
        let swap = Swap::new(
            "swap-orphan", "alice", "bob", "plant-gone", "plant-b", None, 1000,
        );
        swaps.create(&swap).await.unwrap();

        let details = engine.swaps_for_participant("alice").await.unwrap();
        assert_eq!(details.len(), 1);
        assert!(details[0].sender_plant.is_none());
        assert_eq!(details[0].receiver_plant.as_ref().unwrap().id, "plant-b");
    }
}
