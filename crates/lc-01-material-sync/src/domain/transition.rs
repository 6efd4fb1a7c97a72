//! # Status Transition
//!
//! The only sanctioned order of material statuses:
//!
//! ```text
//! pending ──→ in_progress ──→ completed ──→ pending
//! ```
//!
//! Callers never pick an arbitrary target; they ask for "the next one".

use chrono::{DateTime, Utc};
use shared_types::{Material, MaterialStatus, UserRef};

/// Returns the status that follows `current` in the cycle.
#[must_use]
pub fn next_status(current: MaterialStatus) -> MaterialStatus {
    match current {
        MaterialStatus::Pending => MaterialStatus::InProgress,
        MaterialStatus::InProgress => MaterialStatus::Completed,
        MaterialStatus::Completed => MaterialStatus::Pending,
    }
}

/// Next status for a raw wire value.
///
/// Anything outside the cycle (including the indicator-only `"empty"`)
/// yields `Pending`.
#[must_use]
pub fn next_from_wire(current: &str) -> MaterialStatus {
    MaterialStatus::parse(current).map_or(MaterialStatus::Pending, next_status)
}

/// Writes `status` and the fields that depend on it.
///
/// - `start_date` is set the first time the material enters `InProgress`
///   and never cleared here.
/// - `completed_date`/`completed_by` are set on `Completed` and cleared
///   on every other status.
pub fn apply_transition(
    material: &mut Material,
    status: MaterialStatus,
    acting_user: &UserRef,
    now: DateTime<Utc>,
) {
    material.status = status;

    if status == MaterialStatus::InProgress && material.start_date.is_none() {
        material.start_date = Some(now);
    }

    if status.is_completed() {
        material.completed_date = Some(now);
        material.completed_by = Some(acting_user.clone());
    } else {
        material.completed_date = None;
        material.completed_by = None;
    }
}
