/// Walkthrough of the swap lifecycle against in-memory stores
///
/// Shows a proposal, the receiver accepting, both completion
/// confirmations with the ownership transfer, a rejected branch restoring
/// availability, and the change feed a participant would watch.
use std::sync::Arc;
use std::time::Duration;

use leafswap_engine::{EngineConfig, SwapEngine};
use leafswap_lifecycle::ProposalRequest;
use leafswap_store::{InMemoryMessageStore, InMemoryPlantStore, InMemorySwapStore, PlantStore};
use leafswap_types::{Plant, SwapStatus};
use tokio::time::timeout;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let swaps = Arc::new(InMemorySwapStore::new());
    let plants = Arc::new(InMemoryPlantStore::new());
    let messages = Arc::new(InMemoryMessageStore::new());

    plants.insert(Plant::new("plant-monstera", "alice", "Monstera deliciosa", 1_700_000_000));
    plants.insert(Plant::new("plant-pothos", "bob", "Golden pothos", 1_700_000_000));
    plants.insert(Plant::new("plant-fern", "alice", "Boston fern", 1_700_000_000));
    plants.insert(Plant::new("plant-cactus", "carol", "Bunny ears cactus", 1_700_000_000));

    let engine = SwapEngine::new(
        Arc::clone(&swaps),
        Arc::clone(&plants),
        messages,
        EngineConfig::default(),
    );

    // Bob watches his own swap activity.
    let mut feed = engine.subscribe("bob");

    println!("=== 1. Alice proposes her monstera for Bob's pothos ===");
    let proposal = engine
        .propose(
            ProposalRequest::new("alice", "plant-monstera", "plant-pothos")
                .with_message("Trade you for the pothos?"),
        )
        .await?;
    let swap_id = proposal.swap.id.clone();
    println!("  created {} in {}", swap_id, proposal.swap.status);
    if let Some(message) = &proposal.message {
        println!("  opening message: {:?}", message.body);
    }

    let delivery = timeout(Duration::from_millis(100), feed.recv()).await?;
    if let Some(event) = delivery.as_ref().and_then(|d| d.as_swap()) {
        println!("  bob's feed: {:?} for {}", event.kind, event.swap.id);
    }

    println!("\n=== 2. Bob accepts ===");
    let accepted = engine
        .transition(&swap_id, SwapStatus::Accepted, "bob")
        .await?;
    println!("  status now {}", accepted.swap.status);

    println!("\n=== 3. Both confirm the exchange ===");
    let first = engine.confirm_completion(&swap_id, "alice").await?;
    println!("  alice confirmed, completed = {}", first.newly_completed);
    let second = engine.confirm_completion(&swap_id, "bob").await?;
    println!("  bob confirmed, completed = {}", second.newly_completed);

    let monstera = plants.get("plant-monstera").await?.ok_or("plant vanished")?;
    let pothos = plants.get("plant-pothos").await?.ok_or("plant vanished")?;
    println!("  monstera now owned by {}", monstera.owner_id);
    println!("  pothos now owned by {}", pothos.owner_id);

    println!("\n=== 4. A declined proposal frees the plants again ===");
    let declined = engine
        .propose(ProposalRequest::new("carol", "plant-cactus", "plant-fern"))
        .await?;
    engine
        .transition(&declined.swap.id, SwapStatus::Rejected, "alice")
        .await?;
    let fern = plants.get("plant-fern").await?.ok_or("plant vanished")?;
    println!("  fern available again: {}", fern.available);

    println!("\n=== 5. Statistics and allowed actions ===");
    let stats = engine.statistics_for("alice").await?;
    println!(
        "  alice: {} swaps, {} completed, {} rejected",
        stats.total, stats.completed, stats.rejected
    );
    let actions = engine.actions_for(&swap_id, "alice").await?;
    println!("  actions left on the completed swap: {:?}", actions);

    println!("\n=== 6. Drift audit ===");
    let report = engine.reconciler().repair().await?;
    println!(
        "  checked {} swaps, found {} drifts",
        report.swaps_checked,
        report.drifts.len()
    );

    Ok(())
}
