//! Ports layer (Hexagonal Architecture).

pub mod inbound;
pub mod outbound;

pub use inbound::{ChangeContext, LoadingSetter, MaterialStatusApi, StatusChangeOutcome};
pub use outbound::{
    AuthContext, AuthProvider, Clock, MaterialEventPublisher, MaterialRemote,
    MaterialStatusUpdate, RemoteError, SystemClock,
};
