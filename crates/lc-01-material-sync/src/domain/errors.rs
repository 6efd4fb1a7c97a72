//! Material sync error types.

use shared_types::{ProjectId, ThicknessSpecId};
use thiserror::Error;

/// Errors surfaced by a status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterialSyncError {
    /// The project is not held by the store.
    #[error("Project not found: {project_id}")]
    ProjectNotFound { project_id: ProjectId },

    /// The project has no material for the thickness spec.
    #[error("No material for thickness spec {thickness_spec_id} on project {project_id}")]
    MaterialNotFound {
        project_id: ProjectId,
        thickness_spec_id: ThicknessSpecId,
    },

    /// No auth context (token and acting user) is available.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The backend could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The change was committed but the refresh that followed failed.
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),
}

impl MaterialSyncError {
    /// Failures that happen after the optimistic apply and undo it.
    pub fn is_rollback_trigger(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }

    /// Failures detected before anything was mutated.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound { .. } | Self::MaterialNotFound { .. } | Self::Unauthenticated
        )
    }

    /// Message suitable for an alert dialog.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProjectNotFound { .. } => "Project does not exist".to_string(),
            Self::MaterialNotFound { .. } => {
                "No material record exists for this thickness".to_string()
            }
            Self::Unauthenticated => "Authentication token not found, please sign in".to_string(),
            Self::Network(_) => {
                "Failed to update material status: server unreachable".to_string()
            }
            Self::Server { message, .. } if !message.is_empty() => {
                format!("Failed to update material status: {message}")
            }
            Self::Server { .. } => "Failed to update material status: server error".to_string(),
            Self::Reconciliation(_) => {
                "Status saved, but the latest data could not be loaded".to_string()
            }
        }
    }
}
