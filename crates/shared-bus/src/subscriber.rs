//! # Event Subscriber
//!
//! Defines the subscription side of the update bus: synchronous handler
//! guards and channel-backed subscriptions.

use crate::events::{EventFilter, EventTopic, MaterialsEvent};
use crate::publisher::EventHandler;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// Failure reading from a channel subscription.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Every sender is gone; nothing more will arrive.
    #[error("update bus has shut down")]
    Closed,
}

// ---------------------------------------------------------------------------
// Handler registry
// ---------------------------------------------------------------------------

/// Registered handlers, keyed by topic.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    next_id: AtomicU64,
    entries: RwLock<HashMap<EventTopic, Vec<(u64, EventHandler)>>>,
}

impl HandlerRegistry {
    pub(crate) fn insert(&self, topic: EventTopic, handler: EventHandler) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().entry(topic).or_default().push((id, handler));
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.write();
        let mut removed = false;
        entries.retain(|_, handlers| {
            let before = handlers.len();
            handlers.retain(|(handler_id, _)| *handler_id != id);
            removed |= handlers.len() != before;
            !handlers.is_empty()
        });
        removed
    }

    /// Handlers that accept `topic`, in registration order per topic.
    pub(crate) fn snapshot(&self, topic: EventTopic) -> Vec<EventHandler> {
        let entries = self.entries.read();
        [topic, EventTopic::All]
            .iter()
            .filter_map(|t| entries.get(t))
            .flat_map(|handlers| handlers.iter().map(|(_, h)| h.clone()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().values().map(Vec::len).sum()
    }
}

/// Unsubscribe handle for a synchronous handler.
///
/// When dropped, the handler is automatically removed.
pub struct HandlerGuard {
    id: u64,
    registry: Weak<HandlerRegistry>,
}

impl HandlerGuard {
    pub(crate) fn new(id: u64, registry: Weak<HandlerRegistry>) -> Self {
        Self { id, registry }
    }

    /// Removes the handler now. Dropping the guard has the same effect.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// The registry id of this handler.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                debug!(handler_id = self.id, "Handler unsubscribed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Channel subscriptions
// ---------------------------------------------------------------------------

/// Pull-style receiver for bus events, with a filter applied.
///
/// Only events published after the subscription was created are seen.
/// Dropping it closes the receiver, which
/// [`InMemoryEventBus::subscriber_count`](crate::InMemoryEventBus::subscriber_count)
/// reflects immediately.
pub struct Subscription {
    receiver: broadcast::Receiver<MaterialsEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<MaterialsEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Waits for the next event accepted by the filter.
    ///
    /// Resolves to `None` once the bus is dropped. Events lost to lag are
    /// skipped rather than reported.
    pub async fn recv(&mut self) -> Option<MaterialsEvent> {
        use broadcast::error::RecvError;

        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, topics = ?self.filter.topics, "Subscription fell behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::recv`].
    ///
    /// `Ok(None)` means nothing matching is queued right now.
    pub fn try_recv(&mut self) -> Result<Option<MaterialsEvent>, SubscriptionError> {
        use broadcast::error::TryRecvError;

        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

/// [`Subscription`] adapted to `tokio_stream::Stream`.
pub struct EventStream {
    inner: BroadcastStream<MaterialsEvent>,
    filter: EventFilter,
}

impl EventStream {
    /// Wraps `subscription`, keeping its filter.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let Subscription { receiver, filter } = subscription;
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = MaterialsEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<MaterialsEvent>> {
        let this = self.get_mut();
        loop {
            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(event)) if this.filter.matches(&event) => return Poll::Ready(Some(event)),
                Some(Ok(_)) => {}
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    debug!(skipped, "Event stream fell behind");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
