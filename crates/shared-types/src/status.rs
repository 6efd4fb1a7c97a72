//! # Status Vocabularies
//!
//! Three related vocabularies appear in the shop:
//!
//! - `MaterialStatus`: the three-state cycle a `Material` row moves through.
//! - `IndicatorStatus`: the generic four-value vocabulary used by status
//!   indicators, which adds `empty` for "no material row exists here".
//! - `ProjectStatus`: the aggregate status stored on a `Project`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a physical sheet-material item.
///
/// ```text
/// [PENDING] ──→ [IN_PROGRESS] ──→ [COMPLETED]
///     ↑                                │
///     └────────────────────────────────┘
/// ```
///
/// Deserialization is total: any string outside the cycle normalizes to
/// `Pending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum MaterialStatus {
    /// Not yet started.
    #[default]
    Pending,
    /// Being cut.
    InProgress,
    /// Finished.
    Completed,
}

impl MaterialStatus {
    /// All statuses in cycle order.
    pub const ALL: [MaterialStatus; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    /// Strict parse; `None` for anything outside the cycle.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Parses a wire string, normalizing unknown values to `Pending`.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }

    /// The wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Returns true for the terminal state of the cycle.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl From<String> for MaterialStatus {
    fn from(value: String) -> Self {
        Self::from_wire(&value)
    }
}

impl fmt::Display for MaterialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic status-indicator vocabulary.
///
/// `Empty` means no material row exists for a (project, thickness spec)
/// pair. It is never stored on a `Material`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorStatus {
    #[default]
    Empty,
    Pending,
    InProgress,
    Completed,
}

impl IndicatorStatus {
    /// Indicator value for an optional material status.
    #[must_use]
    pub fn from_material(status: Option<MaterialStatus>) -> Self {
        status.map_or(Self::Empty, Self::from)
    }

    /// The material status this indicator shows, if any.
    #[must_use]
    pub fn material_status(&self) -> Option<MaterialStatus> {
        match self {
            Self::Empty => None,
            Self::Pending => Some(MaterialStatus::Pending),
            Self::InProgress => Some(MaterialStatus::InProgress),
            Self::Completed => Some(MaterialStatus::Completed),
        }
    }
}

impl From<MaterialStatus> for IndicatorStatus {
    fn from(status: MaterialStatus) -> Self {
        match status {
            MaterialStatus::Pending => Self::Pending,
            MaterialStatus::InProgress => Self::InProgress,
            MaterialStatus::Completed => Self::Completed,
        }
    }
}

/// Aggregate status of a project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    /// The wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}
