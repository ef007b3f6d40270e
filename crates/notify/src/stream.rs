use std::pin::Pin;
use std::task::{Context, Poll};

use leafswap_types::SwapEvent;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;

use crate::filter::SwapFilter;
use crate::subscription::FeedEvent;

/// [`Stream`] adapter over the swap feed for `StreamExt`-style consumers.
///
/// Yields the same deliveries as [`SwapSubscription::recv`], including
/// explicit [`FeedEvent::Lagged`] gap notices, and terminates once the feed
/// is closed and drained.
///
/// [`SwapSubscription::recv`]: crate::subscription::SwapSubscription::recv
pub struct SwapEventStream {
    inner: BroadcastStream<SwapEvent>,
    filter: SwapFilter,
}

impl SwapEventStream {
    pub fn new(receiver: broadcast::Receiver<SwapEvent>, filter: SwapFilter) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }

    /// The filter this stream was created with.
    pub fn filter(&self) -> &SwapFilter {
        &self.filter
    }
}

impl Stream for SwapEventStream {
    type Item = FeedEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if self.filter.matches(&event) {
                        return Poll::Ready(Some(FeedEvent::Swap(event)));
                    }
                    // Filtered out, poll again for the next event.
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(missed)))) => {
                    return Poll::Ready(Some(FeedEvent::Lagged { missed }));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
