//! # Project Collection
//!
//! The in-memory project/material graph behind the optimistic store.
//!
//! ## Versioning
//!
//! Every local mutation bumps a store-wide version and records it against
//! the material. A refetch carries a [`RefetchTicket`] stamped with the
//! version current when the request was issued:
//!
//! ```text
//! version:  3        4 (apply A)      5 (apply B)
//!           │ ticket(3) issued ──────────────────── response lands
//!           │                                        │
//!           └── A and B were edited after ticket 3, their local fields survive
//! ```
//!
//! Tickets older than the last applied ticket are discarded. Equal tickets
//! apply in arrival order.
//!
//! A material whose change is still awaiting the backend is *held*. A held
//! material keeps its local fields through any refetch, whatever the
//! ticket, because the server cannot know about the change yet. Releasing
//! the hold counts as a fresh local edit, so only refetches issued after
//! the release can replace it.

use super::snapshot::MaterialSnapshot;
use super::transition::apply_transition;
use chrono::{DateTime, Utc};
use shared_types::{
    IndicatorStatus, Material, MaterialId, MaterialStatus, Project, ProjectId, ProjectStatus,
    ThicknessSpecId, UserRef,
};
use std::collections::HashMap;

/// Store version at the time a refetch was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefetchTicket(u64);

impl RefetchTicket {
    pub fn version(&self) -> u64 {
        self.0
    }
}

/// Result of applying a refetch response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefetchOutcome {
    /// The response replaced the collection.
    Applied {
        /// Store version after the apply.
        version: u64,
        /// Number of projects now held.
        projects: usize,
        /// Materials whose newer local edits were kept.
        preserved: Vec<MaterialId>,
    },
    /// The response was older than one already applied and was dropped.
    Stale {
        ticket: RefetchTicket,
        latest: RefetchTicket,
    },
}

impl RefetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Projects plus the version bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct ProjectCollection {
    projects: Vec<Project>,
    version: u64,
    /// Material id -> version of its last local edit.
    local_edits: HashMap<MaterialId, u64>,
    /// Material id -> changes still awaiting the backend.
    held: HashMap<MaterialId, usize>,
    last_applied: Option<RefetchTicket>,
    last_refreshed: Option<DateTime<Utc>>,
}

impl ProjectCollection {
    pub fn new(projects: Vec<Project>) -> Self {
        Self {
            projects,
            ..Self::default()
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, project_id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    /// Material row for (project, thickness spec).
    pub fn material_by_spec(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
    ) -> Option<&Material> {
        self.project(project_id)?.material_by_spec(thickness_spec_id)
    }

    /// Indicator status for (project, thickness spec); `Empty` when either
    /// is missing.
    pub fn indicator_status(
        &self,
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
    ) -> IndicatorStatus {
        self.project(project_id)
            .map_or(IndicatorStatus::Empty, |p| {
                p.indicator_status(thickness_spec_id)
            })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    /// Version of the material's last local edit, if one is outstanding.
    pub fn local_edit_version(&self, material_id: MaterialId) -> Option<u64> {
        self.local_edits.get(&material_id).copied()
    }

    /// True while a change to the material awaits the backend.
    pub fn is_held(&self, material_id: MaterialId) -> bool {
        self.held.contains_key(&material_id)
    }

    /// Marks a change to `material_id` as in flight.
    pub fn hold(&mut self, material_id: MaterialId) {
        *self.held.entry(material_id).or_default() += 1;
    }

    /// Ends one in-flight change to `material_id`.
    ///
    /// Returns the new store version.
    pub fn release(&mut self, material_id: MaterialId) -> u64 {
        if let Some(count) = self.held.get_mut(&material_id) {
            *count -= 1;
            if *count == 0 {
                self.held.remove(&material_id);
            }
        }
        self.record_edit(material_id)
    }

    fn material_mut(&mut self, project_id: ProjectId, material_id: MaterialId) -> Option<&mut Material> {
        self.projects
            .iter_mut()
            .find(|p| p.id == project_id)?
            .material_mut(material_id)
    }

    fn record_edit(&mut self, material_id: MaterialId) -> u64 {
        self.version += 1;
        self.local_edits.insert(material_id, self.version);
        self.version
    }

    /// Optimistically writes a new status.
    ///
    /// Returns the new store version, or `None` if the material is not held.
    pub fn apply_status(
        &mut self,
        project_id: ProjectId,
        material_id: MaterialId,
        status: MaterialStatus,
        acting_user: &UserRef,
        now: DateTime<Utc>,
    ) -> Option<u64> {
        let material = self.material_mut(project_id, material_id)?;
        apply_transition(material, status, acting_user, now);
        Some(self.record_edit(material_id))
    }

    /// Puts captured values back.
    ///
    /// Returns the new store version, or `None` if the material is not held.
    pub fn restore(&mut self, project_id: ProjectId, snapshot: &MaterialSnapshot) -> Option<u64> {
        let material_id = snapshot.material_id();
        let material = self.material_mut(project_id, material_id)?;
        snapshot.restore_into(material);
        Some(self.record_edit(material_id))
    }

    /// Overwrites a project's aggregate status. Not versioned: the next
    /// refetch is authoritative for it.
    pub fn set_project_status(&mut self, project_id: ProjectId, status: ProjectStatus) -> bool {
        match self.projects.iter_mut().find(|p| p.id == project_id) {
            Some(project) => {
                project.status = status;
                true
            }
            None => false,
        }
    }

    /// Stamps a refetch with the current version.
    pub fn issue_ticket(&self) -> RefetchTicket {
        RefetchTicket(self.version)
    }

    /// Applies a server snapshot fetched under `ticket`.
    pub fn apply_refetch(
        &mut self,
        ticket: RefetchTicket,
        mut projects: Vec<Project>,
        now: DateTime<Utc>,
    ) -> RefetchOutcome {
        if let Some(latest) = self.last_applied {
            if ticket < latest {
                return RefetchOutcome::Stale { ticket, latest };
            }
        }

        let mut preserved = Vec::new();
        for project in &mut projects {
            for material in &mut project.materials {
                let edited_after = self
                    .local_edits
                    .get(&material.id)
                    .is_some_and(|&edit| edit > ticket.version());
                if !edited_after && !self.is_held(material.id) {
                    continue;
                }
                if let Some(local) = self
                    .project(project.id)
                    .and_then(|p| p.material(material.id))
                {
                    MaterialSnapshot::capture(local).restore_into(material);
                    preserved.push(material.id);
                }
            }
        }

        self.local_edits.retain(|_, edit| *edit > ticket.version());
        self.projects = projects;
        self.version += 1;
        self.last_applied = Some(ticket);
        self.last_refreshed = Some(now);

        RefetchOutcome::Applied {
            version: self.version,
            projects: self.projects.len(),
            preserved,
        }
    }
}
