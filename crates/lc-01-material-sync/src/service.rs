//! # Material Status Manager
//!
//! Orchestrates one status change:
//!
//! ```text
//! resolve ─→ snapshot ─→ raise flag ─→ apply locally ─→ PUT
//!                                                        │
//!                  ┌──────────── failure ────────────────┤
//!                  ↓                                     ↓ success
//!      restore snapshot, clear flag,          sync project status, refetch,
//!      publish rollback, return Err           publish "materials-updated",
//!                                             clear flag after settle delay
//! ```
//!
//! Precondition failures (`Unauthenticated`, `ProjectNotFound`,
//! `MaterialNotFound`) return before anything is mutated.

use crate::config::SyncConfig;
use crate::domain::{
    derive_project_status, next_status, MaterialSnapshot, MaterialSyncError, RefetchOutcome,
    SyncTracker,
};
use crate::ports::{
    AuthContext, AuthProvider, ChangeContext, Clock, LoadingSetter, MaterialEventPublisher,
    MaterialRemote, MaterialStatusApi, MaterialStatusUpdate, StatusChangeOutcome, SystemClock,
};
use crate::store::OptimisticStore;
use async_trait::async_trait;
use lc_telemetry::{ROLLBACKS, STATUS_CHANGES};
use parking_lot::RwLock;
use shared_bus::{MaterialChange, MaterialsEvent};
use shared_types::{
    IndicatorStatus, Material, MaterialStatus, ProjectId, ProjectStatus, ThicknessSpecId,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Resets the caller's loading indicator when the change finishes.
struct LoadingGuard(Option<LoadingSetter>);

impl LoadingGuard {
    fn start(setter: Option<LoadingSetter>) -> Self {
        if let Some(set) = &setter {
            set(true);
        }
        Self(setter)
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if let Some(set) = &self.0 {
            set(false);
        }
    }
}

/// The Material Status Manager.
///
/// Implements [`MaterialStatusApi`].
pub struct MaterialStatusManager<R, A, P, C = SystemClock>
where
    R: MaterialRemote,
    A: AuthProvider,
    P: MaterialEventPublisher,
    C: Clock,
{
    /// Shared store every view reads from.
    store: OptimisticStore,
    /// Backend.
    remote: R,
    /// Auth context source.
    auth: A,
    /// Update bus.
    publisher: P,
    /// Time source for dates written on materials.
    clock: C,
    /// Service configuration.
    config: SyncConfig,
    /// Sync health.
    tracker: Arc<RwLock<SyncTracker>>,
}

impl<R, A, P> MaterialStatusManager<R, A, P, SystemClock>
where
    R: MaterialRemote,
    A: AuthProvider,
    P: MaterialEventPublisher,
{
    /// Create a manager using the system clock.
    pub fn new(store: OptimisticStore, remote: R, auth: A, publisher: P, config: SyncConfig) -> Self {
        Self::with_clock(store, remote, auth, publisher, SystemClock, config)
    }
}

impl<R, A, P, C> MaterialStatusManager<R, A, P, C>
where
    R: MaterialRemote,
    A: AuthProvider,
    P: MaterialEventPublisher,
    C: Clock,
{
    /// Create a manager with an explicit clock.
    pub fn with_clock(
        store: OptimisticStore,
        remote: R,
        auth: A,
        publisher: P,
        clock: C,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            remote,
            auth,
            publisher,
            clock,
            config,
            tracker: Arc::new(RwLock::new(SyncTracker::new())),
        }
    }

    pub fn store(&self) -> &OptimisticStore {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Copy of the current sync health.
    pub fn sync_state(&self) -> SyncTracker {
        self.tracker.read().clone()
    }

    /// Finds the material for (project, spec) without mutating anything.
    fn resolve(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
    ) -> Result<Material, MaterialSyncError> {
        self.store.read(|collection| {
            let project = collection
                .project(project_id)
                .ok_or(MaterialSyncError::ProjectNotFound { project_id })?;
            project
                .material_by_spec(thickness_spec_id)
                .cloned()
                .ok_or(MaterialSyncError::MaterialNotFound {
                    project_id,
                    thickness_spec_id,
                })
        })
    }

    fn reject(&self, error: MaterialSyncError) -> MaterialSyncError {
        STATUS_CHANGES.with_label_values(&["rejected"]).inc();
        debug!(error = %error, "Status change rejected");
        error
    }

    fn record_error(&self, error: &MaterialSyncError) {
        let mut tracker = self.tracker.write();
        tracker.record_error(self.clock.now(), error.to_string());
        if matches!(error, MaterialSyncError::Network(_)) {
            tracker.set_online(false);
        }
    }

    /// Pushes the recomputed aggregate status when it differs.
    async fn sync_project_status(
        &self,
        auth: &AuthContext,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
        target: MaterialStatus,
        context: &ChangeContext,
    ) -> Result<Option<ProjectStatus>, MaterialSyncError> {
        if !self.config.sync_project_status || context.thickness_specs.is_empty() {
            return Ok(None);
        }
        let Some(project) = self.store.project(project_id) else {
            return Ok(None);
        };
        if project.status == ProjectStatus::Cancelled {
            return Ok(None);
        }

        let derived = derive_project_status(
            &project,
            &context.thickness_specs,
            Some((thickness_spec_id, IndicatorStatus::from(target))),
        );
        if derived == project.status {
            return Ok(None);
        }

        self.remote
            .update_project_status(auth, project_id, derived)
            .await
            .map_err(|e| MaterialSyncError::Reconciliation(e.to_string()))?;
        self.store.set_project_status(project_id, derived);
        info!(project_id, from = %project.status, to = %derived, "Project status updated");
        Ok(Some(derived))
    }

    /// Clears the transition flag once the settle delay has passed.
    fn schedule_settle(&self, generation: u64) {
        let store = self.store.clone();
        let delay = self.config.settle_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) if !delay.is_zero() => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if store.clear_transition(generation) {
                        debug!(generation, "Transition settled");
                    }
                });
            }
            _ => {
                store.clear_transition(generation);
            }
        }
    }

    /// The change algorithm behind [`MaterialStatusApi::change_status`].
    pub async fn change_status(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
        target: MaterialStatus,
        context: ChangeContext,
    ) -> Result<StatusChangeOutcome, MaterialSyncError> {
        let _loading = LoadingGuard::start(context.loading());

        let auth = self
            .auth
            .current()
            .ok_or_else(|| self.reject(MaterialSyncError::Unauthenticated))?;
        let material = self
            .resolve(project_id, thickness_spec_id)
            .map_err(|e| self.reject(e))?;

        let snapshot = MaterialSnapshot::capture(&material);
        let generation = self.store.raise_transition();
        let now = self.clock.now();

        let hold = self.store.hold(material.id);
        self.store
            .mutate_locally(project_id, material.id, target, &auth.user, now);

        let change = MaterialChange {
            correlation_id: Uuid::new_v4(),
            project_id,
            thickness_spec_id,
            material_id: material.id,
            status: target,
            timestamp: now,
        };
        self.publisher
            .publish(MaterialsEvent::StatusApplied(change.clone()));

        debug!(
            correlation_id = %change.correlation_id,
            project_id,
            material_id = material.id,
            from = %snapshot.status(),
            to = %target,
            "Optimistic status applied"
        );

        let update = MaterialStatusUpdate::for_transition(&snapshot, target, &auth.user, now);
        if let Err(remote_error) = self.remote.update_material_status(&auth, &update).await {
            let error = MaterialSyncError::from(remote_error);

            self.store.restore(project_id, &snapshot);
            drop(hold);
            self.store.clear_transition(generation);

            self.publisher.publish(MaterialsEvent::StatusRolledBack {
                change: MaterialChange {
                    status: snapshot.status(),
                    timestamp: self.clock.now(),
                    ..change
                },
                reason: error.user_message(),
            });
            self.record_error(&error);

            ROLLBACKS.inc();
            STATUS_CHANGES.with_label_values(&["rolled_back"]).inc();
            warn!(
                project_id,
                material_id = material.id,
                restored = %snapshot.status(),
                error = %error,
                "Status change failed, rolled back"
            );
            return Err(error);
        }

        // Committed: refetches issued from here on may replace the value.
        drop(hold);
        let mut warnings = Vec::new();

        if let Err(e) = self
            .sync_project_status(&auth, project_id, thickness_spec_id, target, &context)
            .await
        {
            warn!(project_id, error = %e, "Project status sync failed");
            self.record_error(&e);
            warnings.push(e);
        }

        match self.store.refetch_all(&self.remote, &auth).await {
            Ok(outcome) => {
                self.tracker.write().record_success(self.clock.now());
                if let RefetchOutcome::Applied {
                    version,
                    projects,
                    preserved,
                } = outcome
                {
                    self.publisher.publish(MaterialsEvent::StoreRefreshed {
                        version,
                        projects,
                        preserved,
                    });
                }
            }
            Err(e) => {
                let error = MaterialSyncError::Reconciliation(e.to_string());
                warn!(project_id, error = %error, "Refetch after committed change failed");
                self.record_error(&error);
                warnings.insert(0, error);
            }
        }

        self.publisher
            .publish(MaterialsEvent::MaterialsUpdated(change.clone()));
        self.schedule_settle(generation);

        STATUS_CHANGES.with_label_values(&["committed"]).inc();
        info!(
            correlation_id = %change.correlation_id,
            project_id,
            material_id = material.id,
            status = %target,
            warnings = warnings.len(),
            "Material status committed"
        );

        Ok(StatusChangeOutcome {
            correlation_id: change.correlation_id,
            material_id: material.id,
            previous: snapshot.status(),
            status: target,
            warnings,
        })
    }

    /// Changes to the status after the current one.
    pub async fn advance_status(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
        context: ChangeContext,
    ) -> Result<StatusChangeOutcome, MaterialSyncError> {
        let current = self
            .resolve(project_id, thickness_spec_id)
            .map_err(|e| self.reject(e))?
            .status;
        self.change_status(project_id, thickness_spec_id, next_status(current), context)
            .await
    }

    /// Re-reads the authoritative state.
    pub async fn refresh(&self) -> Result<RefetchOutcome, MaterialSyncError> {
        let auth = self.auth.current().ok_or(MaterialSyncError::Unauthenticated)?;
        match self.store.refetch_all(&self.remote, &auth).await {
            Ok(outcome) => {
                self.tracker.write().record_success(self.clock.now());
                if let RefetchOutcome::Applied {
                    version,
                    projects,
                    preserved,
                } = &outcome
                {
                    self.publisher.publish(MaterialsEvent::StoreRefreshed {
                        version: *version,
                        projects: *projects,
                        preserved: preserved.clone(),
                    });
                }
                Ok(outcome)
            }
            Err(e) => {
                let error = MaterialSyncError::from(e);
                self.record_error(&error);
                Err(error)
            }
        }
    }

    /// How long a committed transition keeps the flag raised.
    pub fn settle_delay(&self) -> Duration {
        self.config.settle_delay
    }
}

#[async_trait]
impl<R, A, P, C> MaterialStatusApi for MaterialStatusManager<R, A, P, C>
where
    R: MaterialRemote,
    A: AuthProvider,
    P: MaterialEventPublisher,
    C: Clock,
{
    async fn change_status(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
        target: MaterialStatus,
        context: ChangeContext,
    ) -> Result<StatusChangeOutcome, MaterialSyncError> {
        MaterialStatusManager::change_status(self, project_id, thickness_spec_id, target, context)
            .await
    }

    async fn advance_status(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
        context: ChangeContext,
    ) -> Result<StatusChangeOutcome, MaterialSyncError> {
        MaterialStatusManager::advance_status(self, project_id, thickness_spec_id, context).await
    }

    fn material_status(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
    ) -> IndicatorStatus {
        self.store.indicator_status(project_id, thickness_spec_id)
    }

    async fn refresh(&self) -> Result<RefetchOutcome, MaterialSyncError> {
        MaterialStatusManager::refresh(self).await
    }
}
