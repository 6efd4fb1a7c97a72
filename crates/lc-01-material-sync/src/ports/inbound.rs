//! # Inbound Ports (Driving Ports)
//!
//! The API views call to read and change material status.

use crate::domain::{MaterialSyncError, RefetchOutcome};
use async_trait::async_trait;
use shared_types::{
    IndicatorStatus, MaterialId, MaterialStatus, ProjectId, ThicknessSpec, ThicknessSpecId,
};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Callback toggling a view's loading indicator.
pub type LoadingSetter = Arc<dyn Fn(bool) + Send + Sync>;

/// Optional per-call inputs from the calling view.
#[derive(Clone, Default)]
pub struct ChangeContext {
    /// Thickness specs shown by the view. When non-empty, the project's
    /// aggregate status is recomputed over them after a successful change.
    pub thickness_specs: Vec<ThicknessSpec>,
    loading: Option<LoadingSetter>,
}

impl ChangeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thickness_specs(mut self, specs: Vec<ThicknessSpec>) -> Self {
        self.thickness_specs = specs;
        self
    }

    pub fn with_loading<F>(mut self, setter: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.loading = Some(Arc::new(setter));
        self
    }

    pub(crate) fn loading(&self) -> Option<LoadingSetter> {
        self.loading.clone()
    }
}

impl fmt::Debug for ChangeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeContext")
            .field("thickness_specs", &self.thickness_specs.len())
            .field("loading", &self.loading.is_some())
            .finish()
    }
}

/// A committed status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChangeOutcome {
    pub correlation_id: Uuid,
    pub material_id: MaterialId,
    pub previous: MaterialStatus,
    pub status: MaterialStatus,
    /// Non-fatal failures after the commit (refetch, project status sync).
    pub warnings: Vec<MaterialSyncError>,
}

impl StatusChangeOutcome {
    /// The first warning, if any.
    pub fn warning(&self) -> Option<&MaterialSyncError> {
        self.warnings.first()
    }
}

/// Primary API of the Material Sync subsystem.
#[async_trait]
pub trait MaterialStatusApi: Send + Sync {
    /// Moves the material for (project, thickness spec) to `target`.
    ///
    /// The new status is visible in the store before the remote call is
    /// issued. On a remote failure the store is restored to the values it
    /// held before the call.
    ///
    /// ## Errors
    ///
    /// - `Unauthenticated`, `ProjectNotFound`, `MaterialNotFound`: nothing
    ///   was changed
    /// - `Network`, `Server`: the optimistic change was rolled back
    async fn change_status(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
        target: MaterialStatus,
        context: ChangeContext,
    ) -> Result<StatusChangeOutcome, MaterialSyncError>;

    /// Click-to-advance: changes to the next status in the cycle.
    async fn advance_status(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
        context: ChangeContext,
    ) -> Result<StatusChangeOutcome, MaterialSyncError>;

    /// Indicator status shown for (project, thickness spec).
    fn material_status(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
    ) -> IndicatorStatus;

    /// Re-reads the authoritative state into the store.
    async fn refresh(&self) -> Result<RefetchOutcome, MaterialSyncError>;
}
