//! Captured mutable fields of a material, used to undo an optimistic edit.

use chrono::{DateTime, Utc};
use shared_types::{Material, MaterialId, MaterialStatus, UserRef};

/// Immutable copy of a material's mutable fields.
///
/// Owned by the single status change that captured it and dropped once
/// that change is reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSnapshot {
    material_id: MaterialId,
    status: MaterialStatus,
    start_date: Option<DateTime<Utc>>,
    completed_date: Option<DateTime<Utc>>,
    completed_by: Option<UserRef>,
}

impl MaterialSnapshot {
    /// Captures the current values.
    #[must_use]
    pub fn capture(material: &Material) -> Self {
        Self {
            material_id: material.id,
            status: material.status,
            start_date: material.start_date,
            completed_date: material.completed_date,
            completed_by: material.completed_by.clone(),
        }
    }

    /// Overwrites the material's mutable fields with the captured values.
    pub fn restore_into(&self, material: &mut Material) {
        material.status = self.status;
        material.start_date = self.start_date;
        material.completed_date = self.completed_date;
        material.completed_by = self.completed_by.clone();
    }

    /// Returns true if `material` currently holds exactly the captured values.
    #[must_use]
    pub fn matches(&self, material: &Material) -> bool {
        material.id == self.material_id
            && material.status == self.status
            && material.start_date == self.start_date
            && material.completed_date == self.completed_date
            && material.completed_by == self.completed_by
    }

    pub fn material_id(&self) -> MaterialId {
        self.material_id
    }

    pub fn status(&self) -> MaterialStatus {
        self.status
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }
}
