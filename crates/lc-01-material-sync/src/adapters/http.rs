//! REST client for the shop backend.

use crate::config::SyncConfig;
use crate::ports::{AuthContext, MaterialRemote, MaterialStatusUpdate, RemoteError};
use async_trait::async_trait;
use lc_telemetry::time_remote;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use shared_types::{Project, ProjectId, ProjectStatus};
use tracing::debug;

/// `GET /projects` answers either `{"projects": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProjectsResponse {
    Wrapped { projects: Vec<Project> },
    Bare(Vec<Project>),
}

#[derive(Serialize)]
struct ProjectStatusBody {
    status: ProjectStatus,
}

/// `reqwest`-backed implementation of [`MaterialRemote`].
#[derive(Debug, Clone)]
pub struct RestMaterialClient {
    client: Client,
    base_url: String,
}

impl RestMaterialClient {
    /// Create a client with the configured timeouts.
    pub fn new(config: &SyncConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| RemoteError::Configuration(e.to_string()))?;

        Ok(Self::with_client(client, config.api_base_url.clone()))
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends the request; any non-2xx becomes [`RemoteError::Server`].
    async fn send(&self, request: RequestBuilder, auth: &AuthContext) -> Result<Response, RemoteError> {
        let response = request
            .bearer_auth(&auth.token)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RemoteError::Network(format!("Cannot connect to {}", self.base_url))
                } else if e.is_timeout() {
                    RemoteError::Network(format!("Request to {} timed out", self.base_url))
                } else {
                    RemoteError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Server {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }
}

/// Extracts a readable message from an error body.
///
/// Prefers the JSON `message` field, then `error`, then the raw body, then
/// the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string()
}

#[async_trait]
impl MaterialRemote for RestMaterialClient {
    async fn update_material_status(
        &self,
        auth: &AuthContext,
        update: &MaterialStatusUpdate,
    ) -> Result<(), RemoteError> {
        let _timer = time_remote("update_material");
        let url = self.url(&format!("materials/{}", update.material_id));
        debug!(%url, status = %update.status, "PUT material status");

        self.send(self.client.put(&url).json(update), auth).await?;
        Ok(())
    }

    async fn fetch_projects(&self, auth: &AuthContext) -> Result<Vec<Project>, RemoteError> {
        let _timer = time_remote("fetch_projects");
        let url = self.url("projects");
        debug!(%url, "GET projects");

        let response = self.send(self.client.get(&url), auth).await?;
        let body: ProjectsResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        Ok(match body {
            ProjectsResponse::Wrapped { projects } | ProjectsResponse::Bare(projects) => projects,
        })
    }

    async fn update_project_status(
        &self,
        auth: &AuthContext,
        project_id: ProjectId,
        status: ProjectStatus,
    ) -> Result<(), RemoteError> {
        let _timer = time_remote("update_project");
        let url = self.url(&format!("projects/{project_id}"));
        debug!(%url, %status, "PUT project status");

        self.send(
            self.client.put(&url).json(&ProjectStatusBody { status }),
            auth,
        )
        .await?;
        Ok(())
    }
}
