//! Domain layer for the Material Sync subsystem.
//!
//! Pure logic; no I/O and no async.

pub mod aggregate;
pub mod collection;
pub mod errors;
pub mod snapshot;
pub mod sync_tracker;
pub mod transition;

pub use aggregate::derive_project_status;
pub use collection::{ProjectCollection, RefetchOutcome, RefetchTicket};
pub use errors::MaterialSyncError;
pub use snapshot::MaterialSnapshot;
pub use sync_tracker::{SyncErrorRecord, SyncTracker, MAX_RECENT_ERRORS};
pub use transition::{apply_transition, next_from_wire, next_status};
