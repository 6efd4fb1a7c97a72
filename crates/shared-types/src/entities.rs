//! # Core Domain Entities
//!
//! Defines the shop entities the status sync core operates on.
//!
//! ## Clusters
//!
//! - **Reference data**: `ThicknessSpec`
//! - **Work items**: `Project`, `Material`
//! - **People**: `UserRef`
//!
//! All entities use the backend's camelCase JSON field names.

use crate::status::{IndicatorStatus, MaterialStatus, Priority, ProjectStatus};
use crate::wire::{opt_datetime, UserRefWire};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned project identifier.
pub type ProjectId = u64;

/// Server-assigned material row identifier.
pub type MaterialId = u64;

/// Thickness specification identifier.
pub type ThicknessSpecId = u64;

/// User identifier.
pub type UserId = u64;

/// Reference to a user (worker or operator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "UserRefWire")]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
}

impl UserRef {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl From<UserRefWire> for UserRef {
    fn from(wire: UserRefWire) -> Self {
        match wire {
            UserRefWire::Id(id) => Self {
                id,
                name: String::new(),
            },
            UserRefWire::Full { id, name } => Self { id, name },
        }
    }
}

/// Immutable reference data: one sheet thickness of one material type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThicknessSpec {
    pub id: ThicknessSpecId,
    /// Thickness value as entered (e.g. "2.5").
    pub thickness: String,
    /// Unit of `thickness` (e.g. "mm").
    pub unit: String,
    /// Sheet material type (e.g. "carbon steel").
    pub material_type: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_true() -> bool {
    true
}

/// One thickness-specification instance attached to a project.
///
/// INVARIANT: `completed_date` and `completed_by` are set iff
/// `status == Completed`.
/// INVARIANT: `start_date` is set the first time the material becomes
/// `InProgress` and is not cleared by later transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: MaterialId,
    pub project_id: ProjectId,
    pub thickness_spec_id: ThicknessSpecId,
    pub status: MaterialStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<UserRef>,
    #[serde(default, with = "opt_datetime", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_datetime", skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness_spec: Option<ThicknessSpec>,
}

impl Material {
    /// Creates a pending material with no dates.
    pub fn new(id: MaterialId, project_id: ProjectId, thickness_spec_id: ThicknessSpecId) -> Self {
        Self {
            id,
            project_id,
            thickness_spec_id,
            ..Self::default()
        }
    }

    /// Returns true when the completion fields agree with the status.
    pub fn completion_consistent(&self) -> bool {
        let completed = self.status.is_completed();
        completed == self.completed_date.is_some() && completed == self.completed_by.is_some()
    }
}

/// Aggregate holding the materials list of one job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_worker: Option<UserRef>,
    #[serde(default)]
    pub materials: Vec<Material>,
}

impl Project {
    /// Finds the material row for a thickness spec.
    pub fn material_by_spec(&self, thickness_spec_id: ThicknessSpecId) -> Option<&Material> {
        self.materials
            .iter()
            .find(|m| m.thickness_spec_id == thickness_spec_id)
    }

    /// Mutable variant of [`Project::material_by_spec`].
    pub fn material_by_spec_mut(
        &mut self,
        thickness_spec_id: ThicknessSpecId,
    ) -> Option<&mut Material> {
        self.materials
            .iter_mut()
            .find(|m| m.thickness_spec_id == thickness_spec_id)
    }

    /// Finds a material row by its id.
    pub fn material(&self, material_id: MaterialId) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == material_id)
    }

    /// Mutable variant of [`Project::material`].
    pub fn material_mut(&mut self, material_id: MaterialId) -> Option<&mut Material> {
        self.materials.iter_mut().find(|m| m.id == material_id)
    }

    /// Indicator status for a thickness spec (`Empty` when no row exists).
    pub fn indicator_status(&self, thickness_spec_id: ThicknessSpecId) -> IndicatorStatus {
        IndicatorStatus::from_material(self.material_by_spec(thickness_spec_id).map(|m| m.status))
    }
}
