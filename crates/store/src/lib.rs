pub mod error;
pub mod message_store;
pub mod plant_store;
pub mod swap_store;

pub use error::StoreError;
pub use message_store::{InMemoryMessageStore, MessageStore};
pub use plant_store::{InMemoryPlantStore, PlantPatch, PlantStore};
pub use swap_store::{
    InMemorySwapStore, SwapChanges, SwapGuard, SwapStore, DEFAULT_FEED_CAPACITY,
};
