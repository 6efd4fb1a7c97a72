//! # Shared Bus - Update Notifications Between Views
//!
//! Every open view of the shop (project list, project detail, material
//! board) holds a projection of the same projects. When one of them changes
//! a material status, the others learn about it here.
//!
//! ## Delivery
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Status       │                    │ Project      │
//! │ Manager      │    publish()       │ Detail View  │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │  on() / subscribe()
//!                  │  Event Bus   │ ─────────┘
//!                  └──────────────┘
//! ```
//!
//! - `on()` handlers run synchronously inside `publish()`.
//! - `subscribe()` returns a channel-backed `Subscription` for async consumers.
//! - A handler registered after a publish never sees that event.

#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{
    EventFilter, EventTopic, MaterialChange, MaterialsEvent, LOCAL_STORE_TOPIC,
    MATERIALS_UPDATED_TOPIC, SYNC_TOPIC,
};
pub use publisher::{EventHandler, EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, HandlerGuard, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
