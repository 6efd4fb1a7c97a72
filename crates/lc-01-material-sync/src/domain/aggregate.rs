//! Project aggregate status, derived from its materials.
//!
//! | Present indicator values                  | Project status |
//! |-------------------------------------------|----------------|
//! | any `in_progress`                         | `in_progress`  |
//! | `pending` and `completed`                 | `in_progress`  |
//! | `completed` (no `pending`/`in_progress`)  | `completed`    |
//! | otherwise (`empty`/`pending` only)        | `pending`      |

use shared_types::{IndicatorStatus, Project, ProjectStatus, ThicknessSpec, ThicknessSpecId};

/// Computes the aggregate status over every spec in `specs`.
///
/// A spec without a material counts as `Empty`. `pending_change` overrides
/// the value of one spec, for use before the store reflects the change.
#[must_use]
pub fn derive_project_status(
    project: &Project,
    specs: &[ThicknessSpec],
    pending_change: Option<(ThicknessSpecId, IndicatorStatus)>,
) -> ProjectStatus {
    let statuses: Vec<IndicatorStatus> = specs
        .iter()
        .map(|spec| match pending_change {
            Some((changed, status)) if changed == spec.id => status,
            _ => project.indicator_status(spec.id),
        })
        .collect();

    let has = |wanted: IndicatorStatus| statuses.contains(&wanted);

    if has(IndicatorStatus::InProgress) {
        return ProjectStatus::InProgress;
    }
    if has(IndicatorStatus::Pending) && has(IndicatorStatus::Completed) {
        return ProjectStatus::InProgress;
    }
    if has(IndicatorStatus::Completed) {
        return ProjectStatus::Completed;
    }
    ProjectStatus::Pending
}
