//! Event publisher adapters for the Material Sync subsystem.

use crate::ports::MaterialEventPublisher;
use lc_telemetry::BUS_EVENTS_PUBLISHED;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, MaterialsEvent};
use tracing::trace;

/// Publishes to a shared-bus [`EventPublisher`], counting per topic.
#[derive(Debug, Clone)]
pub struct BusPublisher<B> {
    bus: B,
}

impl<B: EventPublisher> BusPublisher<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B: EventPublisher> MaterialEventPublisher for BusPublisher<B> {
    fn publish(&self, event: MaterialsEvent) -> usize {
        let topic = event.topic();
        BUS_EVENTS_PUBLISHED
            .with_label_values(&[topic.as_str()])
            .inc();
        let reached = self.bus.publish(event);
        trace!(topic = topic.as_str(), reached, "Material event published");
        reached
    }
}

/// No-op publisher for running without an event bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPublisher;

impl MaterialEventPublisher for NoOpPublisher {
    fn publish(&self, _event: MaterialsEvent) -> usize {
        0
    }
}

/// Keeps every published event, for assertions.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<MaterialsEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of every event published so far.
    pub fn events(&self) -> Vec<MaterialsEvent> {
        self.events.lock().clone()
    }

    /// Drains the recorded events.
    pub fn take(&self) -> Vec<MaterialsEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl MaterialEventPublisher for RecordingPublisher {
    fn publish(&self, event: MaterialsEvent) -> usize {
        self.events.lock().push(event);
        1
    }
}
