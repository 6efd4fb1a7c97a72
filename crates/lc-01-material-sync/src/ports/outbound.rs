//! # Outbound Ports
//!
//! Traits for the systems the sync core drives: the REST backend, the
//! authentication context, the clock and the update bus.

use crate::domain::{MaterialSnapshot, MaterialSyncError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use shared_bus::MaterialsEvent;
use shared_types::{MaterialId, MaterialStatus, Project, ProjectId, ProjectStatus, UserId, UserRef};
use std::sync::Arc;
use thiserror::Error;

/// Errors from the remote backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Transport failure (connect, timeout, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// 2xx response whose body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The client could not be constructed.
    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl From<RemoteError> for MaterialSyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Network(message) | RemoteError::Configuration(message) => {
                Self::Network(message)
            }
            RemoteError::Server { status, message } => Self::Server { status, message },
            RemoteError::InvalidResponse(message) => Self::Server { status: 0, message },
        }
    }
}

/// Who is acting and how to prove it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Bearer token.
    pub token: String,
    /// Acting user.
    pub user: UserRef,
}

impl AuthContext {
    pub fn new(token: impl Into<String>, user: UserRef) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

/// Body of `PUT /materials/{id}`.
///
/// Dates go out as `YYYY-MM-DD`, which is what the backend stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialStatusUpdate {
    #[serde(skip)]
    pub material_id: MaterialId,
    pub status: MaterialStatus,
    pub acting_user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<UserId>,
}

impl MaterialStatusUpdate {
    /// Builds the request for moving the material captured in `before`
    /// to `status`.
    pub fn for_transition(
        before: &MaterialSnapshot,
        status: MaterialStatus,
        acting_user: &UserRef,
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.date_naive();
        let completed = status.is_completed();
        Self {
            material_id: before.material_id(),
            status,
            acting_user_id: acting_user.id,
            start_date: (status == MaterialStatus::InProgress && before.start_date().is_none())
                .then_some(today),
            completed_date: completed.then_some(today),
            completed_by: completed.then_some(acting_user.id),
        }
    }
}

/// The REST backend.
#[async_trait]
pub trait MaterialRemote: Send + Sync {
    /// Persists a material status change.
    async fn update_material_status(
        &self,
        auth: &AuthContext,
        update: &MaterialStatusUpdate,
    ) -> Result<(), RemoteError>;

    /// Fetches the full authoritative project and material graph.
    async fn fetch_projects(&self, auth: &AuthContext) -> Result<Vec<Project>, RemoteError>;

    /// Persists a project's aggregate status.
    async fn update_project_status(
        &self,
        auth: &AuthContext,
        project_id: ProjectId,
        status: ProjectStatus,
    ) -> Result<(), RemoteError>;
}

#[async_trait]
impl<R: MaterialRemote + ?Sized> MaterialRemote for Arc<R> {
    async fn update_material_status(
        &self,
        auth: &AuthContext,
        update: &MaterialStatusUpdate,
    ) -> Result<(), RemoteError> {
        (**self).update_material_status(auth, update).await
    }

    async fn fetch_projects(&self, auth: &AuthContext) -> Result<Vec<Project>, RemoteError> {
        (**self).fetch_projects(auth).await
    }

    async fn update_project_status(
        &self,
        auth: &AuthContext,
        project_id: ProjectId,
        status: ProjectStatus,
    ) -> Result<(), RemoteError> {
        (**self).update_project_status(auth, project_id, status).await
    }
}

/// Supplies the current auth context, if signed in.
pub trait AuthProvider: Send + Sync {
    fn current(&self) -> Option<AuthContext>;
}

impl<A: AuthProvider + ?Sized> AuthProvider for Arc<A> {
    fn current(&self) -> Option<AuthContext> {
        (**self).current()
    }
}

/// Time source, abstracted for deterministic tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Publishes sync events to whatever the views listen on.
pub trait MaterialEventPublisher: Send + Sync {
    /// Returns the number of receivers reached.
    fn publish(&self, event: MaterialsEvent) -> usize;
}

impl<P: MaterialEventPublisher + ?Sized> MaterialEventPublisher for Arc<P> {
    fn publish(&self, event: MaterialsEvent) -> usize {
        (**self).publish(event)
    }
}
