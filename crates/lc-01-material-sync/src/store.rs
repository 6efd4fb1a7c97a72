//! # Optimistic Store
//!
//! Shared handle over the project collection every view reads from.
//!
//! - `mutate_locally` / `restore` are synchronous and never fail.
//! - `refetch_all` is async; its network failure is returned to the caller.
//! - The lock is never held across an `.await`: a refetch takes its ticket,
//!   releases the lock, awaits the backend, then re-locks to apply.

use crate::domain::{MaterialSnapshot, ProjectCollection, RefetchOutcome};
use crate::ports::{AuthContext, MaterialRemote, RemoteError};
use chrono::{DateTime, Utc};
use lc_telemetry::{REFETCHES, STORE_VERSION};
use parking_lot::{Mutex, RwLock};
use shared_types::{
    IndicatorStatus, Material, MaterialId, MaterialStatus, Project, ProjectId, ProjectStatus,
    ThicknessSpecId, UserRef,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// "A transition is settling" hint.
///
/// Each raise gets a generation; a clear tagged with an older generation
/// is ignored, so a delayed clear never cancels a newer raise.
#[derive(Debug, Default)]
struct TransitionFlag {
    state: Mutex<FlagState>,
}

#[derive(Debug, Default)]
struct FlagState {
    generation: u64,
    raised: bool,
}

impl TransitionFlag {
    fn raise(&self) -> u64 {
        let mut state = self.state.lock();
        state.generation += 1;
        state.raised = true;
        state.generation
    }

    fn clear_if(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.generation == generation && state.raised {
            state.raised = false;
            true
        } else {
            false
        }
    }

    fn clear(&self) {
        self.state.lock().raised = false;
    }

    fn is_raised(&self) -> bool {
        self.state.lock().raised
    }
}

/// Keeps a material's local fields through refetches while its change
/// awaits the backend. Dropping the hold releases it.
#[derive(Debug)]
#[must_use = "dropping the hold releases the material immediately"]
pub struct EditHold {
    state: Arc<RwLock<ProjectCollection>>,
    material_id: MaterialId,
}

impl EditHold {
    pub fn material_id(&self) -> MaterialId {
        self.material_id
    }
}

impl Drop for EditHold {
    fn drop(&mut self) {
        let version = self.state.write().release(self.material_id);
        STORE_VERSION.set(version as f64);
        debug!(material_id = self.material_id, version, "Material hold released");
    }
}

/// Cloneable handle to the shared project collection.
#[derive(Debug, Clone, Default)]
pub struct OptimisticStore {
    state: Arc<RwLock<ProjectCollection>>,
    flag: Arc<TransitionFlag>,
}

impl OptimisticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an initial project list.
    pub fn with_projects(projects: Vec<Project>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ProjectCollection::new(projects))),
            flag: Arc::default(),
        }
    }

    /// Runs `f` against the collection under a read lock.
    pub fn read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&ProjectCollection) -> T,
    {
        f(&self.state.read())
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state.read().projects().to_vec()
    }

    pub fn project(&self, project_id: ProjectId) -> Option<Project> {
        self.state.read().project(project_id).cloned()
    }

    pub fn material_by_spec(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
    ) -> Option<Material> {
        self.state
            .read()
            .material_by_spec(project_id, thickness_spec_id)
            .cloned()
    }

    /// `Empty` when the project or its material for the spec is missing.
    pub fn indicator_status(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
    ) -> IndicatorStatus {
        self.state
            .read()
            .indicator_status(project_id, thickness_spec_id)
    }

    pub fn version(&self) -> u64 {
        self.state.read().version()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_refreshed()
    }

    /// Writes `status` and its dependent date/user fields.
    ///
    /// A material the store does not hold is ignored.
    pub fn mutate_locally(
        &self,
        project_id: ProjectId,
        material_id: MaterialId,
        status: MaterialStatus,
        acting_user: &UserRef,
        now: DateTime<Utc>,
    ) {
        let applied = self
            .state
            .write()
            .apply_status(project_id, material_id, status, acting_user, now);
        match applied {
            Some(version) => {
                STORE_VERSION.set(version as f64);
                debug!(project_id, material_id, %status, version, "Local status applied");
            }
            None => debug!(project_id, material_id, "Local mutation skipped, material not held"),
        }
    }

    /// Holds `material_id` until the returned guard is dropped.
    pub fn hold(&self, material_id: MaterialId) -> EditHold {
        self.state.write().hold(material_id);
        EditHold {
            state: Arc::clone(&self.state),
            material_id,
        }
    }

    pub fn is_held(&self, material_id: MaterialId) -> bool {
        self.state.read().is_held(material_id)
    }

    /// Puts the snapshot's values back into the material.
    pub fn restore(&self, project_id: ProjectId, snapshot: &MaterialSnapshot) {
        if let Some(version) = self.state.write().restore(project_id, snapshot) {
            STORE_VERSION.set(version as f64);
            debug!(
                project_id,
                material_id = snapshot.material_id(),
                status = %snapshot.status(),
                version,
                "Material restored from snapshot"
            );
        }
    }

    /// Overwrites a project's aggregate status locally.
    pub fn set_project_status(&self, project_id: ProjectId, status: ProjectStatus) -> bool {
        self.state.write().set_project_status(project_id, status)
    }

    /// Replaces the whole collection from an authoritative source.
    pub async fn refetch_all<R>(
        &self,
        remote: &R,
        auth: &AuthContext,
    ) -> Result<RefetchOutcome, RemoteError>
    where
        R: MaterialRemote + ?Sized,
    {
        let ticket = self.state.read().issue_ticket();

        let projects = match remote.fetch_projects(auth).await {
            Ok(projects) => projects,
            Err(e) => {
                REFETCHES.with_label_values(&["failed"]).inc();
                warn!(ticket = ticket.version(), error = %e, "Refetch failed");
                return Err(e);
            }
        };

        let outcome = self
            .state
            .write()
            .apply_refetch(ticket, projects, Utc::now());

        match &outcome {
            RefetchOutcome::Applied {
                version,
                projects,
                preserved,
            } => {
                REFETCHES.with_label_values(&["applied"]).inc();
                STORE_VERSION.set(*version as f64);
                debug!(
                    ticket = ticket.version(),
                    version,
                    projects,
                    preserved = preserved.len(),
                    "Refetch applied"
                );
            }
            RefetchOutcome::Stale { latest, .. } => {
                REFETCHES.with_label_values(&["stale"]).inc();
                debug!(
                    ticket = ticket.version(),
                    latest = latest.version(),
                    "Stale refetch discarded"
                );
            }
        }

        Ok(outcome)
    }

    /// Raises the transition flag and returns its generation.
    pub fn raise_transition(&self) -> u64 {
        self.flag.raise()
    }

    /// Clears the flag unless a newer raise happened since `generation`.
    pub fn clear_transition(&self, generation: u64) -> bool {
        self.flag.clear_if(generation)
    }

    /// Sets the flag directly, without generation tracking.
    pub fn set_transition_flag(&self, raised: bool) {
        if raised {
            self.flag.raise();
        } else {
            self.flag.clear();
        }
    }

    /// True while a transition is settling.
    pub fn is_transitioning(&self) -> bool {
        self.flag.is_raised()
    }
}
