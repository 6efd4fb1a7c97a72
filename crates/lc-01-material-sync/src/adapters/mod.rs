//! Adapters layer for the Material Sync subsystem.
//!
//! - `http`: REST backend client
//! - `publisher`: update bus publishers
//! - `auth`: in-process auth context
//! - `subscriber`: refresh-on-notify listener

pub mod auth;
pub mod http;
pub mod publisher;
pub mod subscriber;

pub use auth::StaticAuthProvider;
pub use http::RestMaterialClient;
pub use publisher::{BusPublisher, NoOpPublisher, RecordingPublisher};
pub use subscriber::RefreshListener;
