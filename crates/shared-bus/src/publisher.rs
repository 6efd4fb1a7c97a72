//! # Event Publisher
//!
//! Defines the publishing side of the update bus.
//!
//! `publish` dispatches synchronously to every handler registered at the
//! moment of the call, then forwards the event to channel subscribers.
//! Handlers registered after a publish do not see that event.

use crate::events::{EventFilter, EventTopic, MaterialsEvent};
use crate::subscriber::{EventStream, HandlerGuard, HandlerRegistry, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Outbound side of the update bus.
///
/// The sync core holds one of these to tell every open view that material
/// state changed.
pub trait EventPublisher: Send + Sync {
    /// Delivers `event` and reports how many handlers and channel
    /// subscribers saw it. Zero listeners is not an error.
    fn publish(&self, event: MaterialsEvent) -> usize;

    /// Lifetime count of `publish` calls.
    fn events_published(&self) -> u64;
}

/// Callback invoked synchronously on publish.
pub type EventHandler = Arc<dyn Fn(&MaterialsEvent) + Send + Sync>;

/// In-memory implementation of the update bus.
///
/// Uses `tokio::sync::broadcast` for channel subscribers and a handler
/// registry for synchronous callbacks. Suitable for a single process; there
/// is no delivery across process restarts.
pub struct InMemoryEventBus {
    /// Broadcast sender for channel subscribers.
    sender: broadcast::Sender<MaterialsEvent>,

    /// Synchronous handlers by topic.
    handlers: Arc<HandlerRegistry>,

    published: AtomicU64,

    /// Per-subscriber backlog before lagging readers drop events.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Bus with [`DEFAULT_CHANNEL_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus whose channel subscribers may fall `capacity` events behind.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            handlers: Arc::default(),
            published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Register a synchronous handler for a topic.
    ///
    /// The returned guard unsubscribes the handler when dropped or when
    /// [`HandlerGuard::unsubscribe`] is called.
    #[must_use = "dropping the guard unsubscribes the handler"]
    pub fn on<F>(&self, topic: EventTopic, handler: F) -> HandlerGuard
    where
        F: Fn(&MaterialsEvent) + Send + Sync + 'static,
    {
        let id = self.handlers.insert(topic, Arc::new(handler));
        debug!(topic = topic.as_str(), handler_id = id, "Handler registered");
        HandlerGuard::new(id, Arc::downgrade(&self.handlers))
    }

    /// Register a handler by topic name (e.g. `"materials-updated"`).
    ///
    /// Returns `None` for unknown topic names.
    #[must_use]
    pub fn on_named<F>(&self, topic: &str, handler: F) -> Option<HandlerGuard>
    where
        F: Fn(&MaterialsEvent) + Send + Sync + 'static,
    {
        EventTopic::from_name(topic).map(|t| self.on(t, handler))
    }

    /// Opens a pull-style subscription for events accepted by `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(
            topics = ?filter.topics,
            projects = ?filter.project_ids,
            "Subscription opened"
        );
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Same as [`InMemoryEventBus::subscribe`], as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Live channel subscriptions (handlers not included).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Registered synchronous handlers over every topic.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: MaterialsEvent) -> usize {
        let topic = event.topic();
        self.published.fetch_add(1, Ordering::Relaxed);

        // Snapshot under the lock, call outside it: handlers may register
        // or unsubscribe while being dispatched.
        let handlers = self.handlers.snapshot(topic);
        for handler in &handlers {
            handler(&event);
        }

        let receivers = match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                trace!(topic = topic.as_str(), "No channel subscribers");
                0
            }
        };

        debug!(
            topic = topic.as_str(),
            handlers = handlers.len(),
            receivers,
            "Event published"
        );
        handlers.len() + receivers
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl<P: EventPublisher + ?Sized> EventPublisher for Arc<P> {
    fn publish(&self, event: MaterialsEvent) -> usize {
        (**self).publish(event)
    }

    fn events_published(&self) -> u64 {
        (**self).events_published()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MaterialChange;
    use chrono::Utc;
    use shared_types::MaterialStatus;
    use std::sync::atomic::AtomicUsize;
    use uuid::Uuid;

    fn updated() -> MaterialsEvent {
        MaterialsEvent::MaterialsUpdated(MaterialChange {
            correlation_id: Uuid::from_u128(7),
            project_id: 1,
            thickness_spec_id: 2,
            material_id: 3,
            status: MaterialStatus::Completed,
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn test_publish_no_subscribers() {
        let bus = InMemoryEventBus::new();
        assert_eq!(bus.publish(updated()), 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[test]
    fn test_handler_receives_synchronously() {
        let bus = InMemoryEventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _guard = bus.on(EventTopic::MaterialsUpdated, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let reached = bus.publish(updated());

        assert_eq!(reached, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_topic_isolation() {
        let bus = InMemoryEventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _guard = bus.on(EventTopic::Sync, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(updated());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_all_topic_handler_sees_everything() {
        let bus = InMemoryEventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _guard = bus.on(EventTopic::All, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(updated());
        bus.publish(MaterialsEvent::StoreRefreshed {
            version: 1,
            projects: 0,
            preserved: vec![],
        });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = InMemoryEventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let guard = bus.on(EventTopic::MaterialsUpdated, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(updated());
        guard.unsubscribe();
        bus.publish(updated());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_handler_registered_during_dispatch_misses_current_event() {
        let bus = Arc::new(InMemoryEventBus::new());
        let late_hits = Arc::new(AtomicUsize::new(0));
        let late_guards = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let bus_ref = Arc::downgrade(&bus);
        let hits = late_hits.clone();
        let guards = late_guards.clone();
        let _guard = bus.on(EventTopic::MaterialsUpdated, move |_| {
            if let Some(bus) = bus_ref.upgrade() {
                let hits = hits.clone();
                guards.lock().push(bus.on(EventTopic::MaterialsUpdated, move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                }));
            }
        });

        bus.publish(updated());
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);

        bus.publish(updated());
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_named_resolves_topic() {
        let bus = InMemoryEventBus::new();
        assert!(bus.on_named("materials-updated", |_| {}).is_some());
        assert!(bus.on_named("no-such-topic", |_| {}).is_none());
    }

    #[tokio::test]
    async fn test_publish_counts_handlers_and_channels_together() {
        let bus = InMemoryEventBus::new();
        let _view = bus.subscribe(EventFilter::all());
        let _handler = bus.on(EventTopic::All, |_| {});

        assert_eq!(bus.publish(updated()), 2);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_fresh_bus_is_idle() {
        let bus = InMemoryEventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(
            (bus.subscriber_count(), bus.handler_count(), bus.events_published()),
            (0, 0, 0)
        );
    }
}
