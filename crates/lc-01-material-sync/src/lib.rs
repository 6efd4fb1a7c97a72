//! # Material Status Sync Subsystem
//!
//! **Subsystem ID:** LC-01
//!
//! ## Purpose
//!
//! Moves a material (one thickness spec on one project) through the cycle
//! `pending → in_progress → completed → pending`. The new status is shown
//! immediately, persisted to the REST backend, reconciled by a refetch, and
//! broadcast to every open view on the `"materials-updated"` topic. A failed
//! persist restores the exact prior values.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Cycle is closed, `next(next(next(s))) == s` | `domain/transition.rs` - `next_status()` |
//! | INVARIANT-2 | `completed_date`/`completed_by` set iff `completed` | `domain/transition.rs` - `apply_transition()` |
//! | INVARIANT-3 | `start_date` set once, on first `in_progress` | `domain/transition.rs` - `apply_transition()` |
//! | INVARIANT-4 | Rollback restores the captured values exactly | `domain/snapshot.rs` - `restore_into()` |
//! | INVARIANT-5 | A stale refetch never overwrites newer state | `domain/collection.rs` - `apply_refetch()` |
//! | INVARIANT-6 | A delayed flag clear never cancels a newer raise | `store.rs` - `TransitionFlag::clear_if()` |
//! | INVARIANT-7 | Precondition failures mutate nothing | `service.rs` - `resolve()` |
//!
//! ## Change Protocol
//!
//! ```text
//! [stored] ──apply──→ [optimistic] ──PUT ok──→ [committed] ──refetch──→ [authoritative]
//!                          │
//!                          └── PUT failed ──→ [restored snapshot]
//! ```
//!
//! | Stage | Method | Effect |
//! |-------|--------|--------|
//! | Apply | `store.mutate_locally()` | Status visible to every view |
//! | Persist | `remote.update_material_status()` | `PUT /materials/{id}` |
//! | Rollback | `store.restore()` | Snapshot values written back |
//! | Reconcile | `store.refetch_all()` | `GET /projects`, versioned apply |
//! | Notify | `publisher.publish()` | `"materials-updated"` |
//! | Settle | settle timer | Transition flag cleared after 1.5s |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - REST client, bus publisher, refresh listener, auth │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - MaterialStatusApi trait                    │
//! │  ports/outbound.rs - MaterialRemote, AuthProvider, Clock        │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/transition.rs   - status cycle and dependent fields     │
//! │  domain/snapshot.rs     - MaterialSnapshot                      │
//! │  domain/collection.rs   - versioned ProjectCollection           │
//! │  domain/aggregate.rs    - project status derivation             │
//! │  domain/sync_tracker.rs - sync health                           │
//! │  domain/errors.rs       - MaterialSyncError enum                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = SyncConfig::from_env()?;
//! let bus = Arc::new(InMemoryEventBus::new());
//! let store = OptimisticStore::new();
//! let remote = Arc::new(RestMaterialClient::new(&config)?);
//! let auth = Arc::new(StaticAuthProvider::new(token, user));
//!
//! let manager = MaterialStatusManager::new(
//!     store.clone(),
//!     remote.clone(),
//!     auth.clone(),
//!     BusPublisher::new(bus.clone()),
//!     config,
//! );
//! manager.advance_status(project_id, spec_id, ChangeContext::new()).await?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod store;

pub use adapters::*;
pub use config::{ConfigError, SyncConfig};
pub use domain::*;
pub use ports::*;
pub use service::MaterialStatusManager;
pub use store::{EditHold, OptimisticStore};
