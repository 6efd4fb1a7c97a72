//! # HTTP Flow
//!
//! Drives the status manager through the real REST client against a mock
//! backend: request bodies, bearer auth, refetch parsing and the alert text
//! produced from server error bodies.

#[cfg(test)]
mod tests {
    use lc_01_material_sync::{
        ChangeContext, MaterialStatusApi, MaterialStatusManager, MaterialSyncError,
        OptimisticStore, RecordingPublisher, RestMaterialClient, StaticAuthProvider, SyncConfig,
    };
    use serde_json::{json, Value};
    use shared_bus::MaterialsEvent;
    use shared_types::{
        IndicatorStatus, Material, MaterialStatus, Project, ProjectStatus, ThicknessSpec, UserRef,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{body_json, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> SyncConfig {
        SyncConfig {
            api_base_url: format!("{}/api", server.uri()),
            ..SyncConfig::default()
        }
    }

    fn local_projects() -> Vec<Project> {
        vec![Project {
            id: 5,
            name: "Enclosures".into(),
            status: ProjectStatus::Pending,
            materials: vec![Material::new(50, 5, 2), Material::new(51, 5, 3)],
            ..Project::default()
        }]
    }

    fn server_projects(status_50: &str, project_status: &str) -> Value {
        json!({
            "projects": [{
                "id": 5,
                "name": "Enclosures",
                "status": project_status,
                "priority": "medium",
                "materials": [
                    {"id": 50, "projectId": 5, "thicknessSpecId": 2, "status": status_50,
                     "startDate": "2024-05-06"},
                    {"id": 51, "projectId": 5, "thicknessSpecId": 3, "status": "pending"}
                ]
            }]
        })
    }

    fn spec(id: u64) -> ThicknessSpec {
        ThicknessSpec {
            id,
            thickness: "1.5".into(),
            unit: "mm".into(),
            material_type: "aluminium".into(),
            is_active: true,
            sort_order: id as i32,
        }
    }

    fn manager(
        server: &MockServer,
    ) -> (
        MaterialStatusManager<RestMaterialClient, StaticAuthProvider, Arc<RecordingPublisher>>,
        Arc<RecordingPublisher>,
    ) {
        manager_for(config(server))
    }

    fn manager_for(
        config: SyncConfig,
    ) -> (
        MaterialStatusManager<RestMaterialClient, StaticAuthProvider, Arc<RecordingPublisher>>,
        Arc<RecordingPublisher>,
    ) {
        let client = RestMaterialClient::new(&config).unwrap();
        let publisher = Arc::new(RecordingPublisher::new());
        let manager = MaterialStatusManager::new(
            OptimisticStore::with_projects(local_projects()),
            client,
            StaticAuthProvider::new("shop-token", UserRef::new(4, "Dana")),
            publisher.clone(),
            config,
        );
        (manager, publisher)
    }

    #[tokio::test]
    async fn test_start_material_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/materials/50"))
            .and(header("authorization", "Bearer shop-token"))
            .and(body_partial_json(json!({"status": "in_progress", "actingUserId": 4})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/projects/5"))
            .and(body_json(json!({"status": "in_progress"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(server_projects("in_progress", "in_progress")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (manager, publisher) = manager(&server);
        let context = ChangeContext::new().with_thickness_specs(vec![spec(2), spec(3)]);
        let outcome = manager
            .change_status(5, 2, MaterialStatus::InProgress, context)
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());
        let material = manager.store().material_by_spec(5, 2).unwrap();
        assert_eq!(material.status, MaterialStatus::InProgress);
        assert_eq!(
            material.start_date.map(|d| d.date_naive().to_string()),
            Some("2024-05-06".to_string())
        );
        assert_eq!(
            manager.store().project(5).map(|p| p.status),
            Some(ProjectStatus::InProgress)
        );
        assert!(publisher
            .events()
            .iter()
            .any(|e| matches!(e, MaterialsEvent::MaterialsUpdated(_))));
    }

    #[tokio::test]
    async fn test_completion_body_carries_dates_and_user() {
        let server = MockServer::start().await;
        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        Mock::given(method("PUT"))
            .and(path("/api/materials/51"))
            .and(body_json(json!({
                "status": "completed",
                "actingUserId": 4,
                "completedDate": today,
                "completedBy": 4
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(server_projects("pending", "pending")))
            .mount(&server)
            .await;

        let (manager, _) = manager(&server);
        manager
            .change_status(5, 3, MaterialStatus::Completed, ChangeContext::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_server_rejection_rolls_back_with_alert_text() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/materials/50"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": "Database unavailable"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(server_projects("pending", "pending")))
            .expect(0)
            .mount(&server)
            .await;

        let metrics = lc_telemetry::register_metrics().unwrap();
        let (manager, publisher) = manager(&server);
        let before = manager.store().projects();

        let err = manager
            .change_status(5, 2, MaterialStatus::InProgress, ChangeContext::new())
            .await
            .unwrap_err();

        assert_eq!(
            err.user_message(),
            "Failed to update material status: Database unavailable"
        );
        assert_eq!(manager.store().projects(), before);
        assert_eq!(manager.material_status(5, 2), IndicatorStatus::Pending);

        let rolled_back = publisher
            .events()
            .into_iter()
            .find_map(|e| match e {
                MaterialsEvent::StatusRolledBack { reason, .. } => Some(reason),
                _ => None,
            });
        assert_eq!(
            rolled_back.as_deref(),
            Some("Failed to update material status: Database unavailable")
        );

        let exposition = metrics.encode().unwrap();
        assert!(exposition.contains("lc_material_rollbacks_total"));
        assert!(exposition.contains("outcome=\"rolled_back\""));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let (manager, _) = manager_for(SyncConfig {
            api_base_url: "http://127.0.0.1:9/api".into(),
            connect_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(500),
            ..SyncConfig::default()
        });

        let err = manager
            .change_status(5, 2, MaterialStatus::InProgress, ChangeContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MaterialSyncError::Network(_)));
        assert_eq!(manager.material_status(5, 2), IndicatorStatus::Pending);
        assert!(!manager.sync_state().is_online());
    }
}
