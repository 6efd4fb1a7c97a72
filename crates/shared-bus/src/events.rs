//! # Material Events
//!
//! Defines all event types that flow through the update bus.
//!
//! Every event names the entity that changed and its new state, so a view
//! can patch itself incrementally. Views that prefer to re-derive their
//! display may ignore the payload and re-read the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{MaterialId, MaterialStatus, ProjectId, ThicknessSpecId};
use uuid::Uuid;

/// Wire name of the cross-view notification topic.
pub const MATERIALS_UPDATED_TOPIC: &str = "materials-updated";

/// Wire name of the local optimistic-store topic.
pub const LOCAL_STORE_TOPIC: &str = "materials-local";

/// Wire name of the reconciliation topic.
pub const SYNC_TOPIC: &str = "materials-sync";

/// A single material status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialChange {
    /// Identifies one status-change request across all its events.
    pub correlation_id: Uuid,
    pub project_id: ProjectId,
    pub thickness_spec_id: ThicknessSpecId,
    pub material_id: MaterialId,
    /// The status now visible in the store.
    pub status: MaterialStatus,
    pub timestamp: DateTime<Utc>,
}

/// All events that can be published to the update bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MaterialsEvent {
    // =========================================================================
    // LOCAL STORE
    // =========================================================================
    /// An optimistic status was written to the store, before server
    /// confirmation.
    StatusApplied(MaterialChange),

    /// A failed change was reverted; `status` is the restored value.
    StatusRolledBack {
        change: MaterialChange,
        /// Human-readable failure reason.
        reason: String,
    },

    // =========================================================================
    // CROSS-VIEW NOTIFICATION ("materials-updated")
    // =========================================================================
    /// A status change was committed by the server.
    MaterialsUpdated(MaterialChange),

    // =========================================================================
    // RECONCILIATION
    // =========================================================================
    /// An authoritative refetch replaced the store contents.
    StoreRefreshed {
        /// Store version after the refetch was applied.
        version: u64,
        /// Number of projects now held.
        projects: usize,
        /// Materials whose newer local edits survived the refetch.
        preserved: Vec<MaterialId>,
    },
}

impl MaterialsEvent {
    /// The topic this event is delivered on.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::StatusApplied(_) | Self::StatusRolledBack { .. } => EventTopic::LocalStore,
            Self::MaterialsUpdated(_) => EventTopic::MaterialsUpdated,
            Self::StoreRefreshed { .. } => EventTopic::Sync,
        }
    }

    /// The material change carried by this event, if any.
    #[must_use]
    pub fn change(&self) -> Option<&MaterialChange> {
        match self {
            Self::StatusApplied(change)
            | Self::MaterialsUpdated(change)
            | Self::StatusRolledBack { change, .. } => Some(change),
            Self::StoreRefreshed { .. } => None,
        }
    }

    /// The project this event concerns, if any.
    #[must_use]
    pub fn project_id(&self) -> Option<ProjectId> {
        self.change().map(|c| c.project_id)
    }
}

/// Named channels on the update bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Committed changes every open view must reflect.
    MaterialsUpdated,
    /// Optimistic applies and rollbacks.
    LocalStore,
    /// Authoritative refetches.
    Sync,
    /// Wildcard; accepts every topic.
    All,
}

impl EventTopic {
    /// The well-known topic string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaterialsUpdated => MATERIALS_UPDATED_TOPIC,
            Self::LocalStore => LOCAL_STORE_TOPIC,
            Self::Sync => SYNC_TOPIC,
            Self::All => "*",
        }
    }

    /// Resolves a topic string.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            MATERIALS_UPDATED_TOPIC => Some(Self::MaterialsUpdated),
            LOCAL_STORE_TOPIC => Some(Self::LocalStore),
            SYNC_TOPIC => Some(Self::Sync),
            "*" => Some(Self::All),
            _ => None,
        }
    }

    /// Returns true if an event on `topic` is delivered to this topic.
    #[must_use]
    pub fn accepts(&self, topic: EventTopic) -> bool {
        *self == EventTopic::All || *self == topic
    }
}

/// Criteria a view uses to narrow what it hears.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Wanted topics; empty accepts any.
    pub topics: Vec<EventTopic>,
    /// Projects to include. Empty means all projects.
    pub project_ids: Vec<ProjectId>,
}

impl EventFilter {
    /// Accepts everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accepts only the listed topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            project_ids: Vec::new(),
        }
    }

    /// Create a filter for events about specific projects.
    #[must_use]
    pub fn for_projects(project_ids: Vec<ProjectId>) -> Self {
        Self {
            topics: Vec::new(),
            project_ids,
        }
    }

    /// True when `event` passes both the topic and the project criteria.
    ///
    /// Events without a project (store refreshes) pass any project filter,
    /// since they may touch every project.
    #[must_use]
    pub fn matches(&self, event: &MaterialsEvent) -> bool {
        let topic = event.topic();
        let topic_match =
            self.topics.is_empty() || self.topics.iter().any(|t| t.accepts(topic));

        let project_match = self.project_ids.is_empty()
            || event
                .project_id()
                .map_or(true, |id| self.project_ids.contains(&id));

        topic_match && project_match
    }
}
