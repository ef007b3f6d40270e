pub mod filter;
pub mod reducer;
pub mod stream;
pub mod subscription;

pub use filter::SwapFilter;
pub use stream::SwapEventStream;
pub use subscription::{FeedError, FeedEvent, SwapSubscription};
