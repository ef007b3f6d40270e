use leafswap_types::SwapEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::debug;

use crate::filter::SwapFilter;

/// Error returned by non-blocking feed reads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// Every publisher dropped; no further events will arrive.
    #[error("swap feed closed")]
    Closed,
}

/// One delivery from the swap feed.
///
/// The feed is lossy under backpressure. When a subscriber falls behind and
/// the channel evicts events it has not read, the gap is surfaced as
/// [`FeedEvent::Lagged`] instead of being silently skipped, so the consumer
/// knows its view is stale and can re-list from the store before resuming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeedEvent {
    /// A committed swap write that passed the subscription filter.
    Swap(SwapEvent),
    /// The subscriber fell behind and `missed` events were evicted unseen.
    Lagged { missed: u64 },
}

impl FeedEvent {
    /// The swap event, if this delivery carries one.
    pub fn as_swap(&self) -> Option<&SwapEvent> {
        match self {
            Self::Swap(event) => Some(event),
            Self::Lagged { .. } => None,
        }
    }

    /// Whether this delivery marks a gap in the feed.
    pub fn is_lagged(&self) -> bool {
        matches!(self, Self::Lagged { .. })
    }
}

/// A filtered view of the swap change feed.
///
/// Wraps a broadcast receiver handed out by the store and applies a
/// [`SwapFilter`] on the consumer side, so the store publishes each commit
/// exactly once regardless of how many subscribers are watching.
#[derive(Debug)]
pub struct SwapSubscription {
    receiver: broadcast::Receiver<SwapEvent>,
    filter: SwapFilter,
}

impl SwapSubscription {
    pub fn new(receiver: broadcast::Receiver<SwapEvent>, filter: SwapFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next delivery, waiting if the feed is idle.
    ///
    /// Returns `None` once the feed is closed and drained. Events that do
    /// not pass the filter are skipped. A lag gap is reported immediately;
    /// the filter is not applied to it because the evicted events are gone
    /// and any of them might have matched.
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Some(FeedEvent::Swap(event));
                    }
                }
                Err(RecvError::Closed) => return None,
                Err(RecvError::Lagged(missed)) => {
                    debug!(missed, "swap feed subscriber lagged");
                    return Some(FeedEvent::Lagged { missed });
                }
            }
        }
    }

    /// Receive without waiting.
    ///
    /// Returns `Ok(None)` when the feed is idle and `Err(FeedError::Closed)`
    /// once it is closed and drained.
    pub fn try_recv(&mut self) -> Result<Option<FeedEvent>, FeedError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(FeedEvent::Swap(event)));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(FeedError::Closed),
                Err(TryRecvError::Lagged(missed)) => {
                    debug!(missed, "swap feed subscriber lagged");
                    return Ok(Some(FeedEvent::Lagged { missed }));
                }
            }
        }
    }

    /// The filter this subscription was created with.
    pub fn filter(&self) -> &SwapFilter {
        &self.filter
    }
}
