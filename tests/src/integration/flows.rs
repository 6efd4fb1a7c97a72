//! # Integration Test Flows
//!
//! Tests that lc-01-material-sync, shared-bus and shared-types work together:
//!
//! 1. **Optimistic change → rollback**: the store shows the new status while
//!    the backend call is in flight and reverts exactly when it fails
//! 2. **Cross-view notification**: a committed change reaches bus handlers
//!    and a second view's refresh listener
//! 3. **Stale refetch**: a refetch issued before a local edit never
//!    overwrites that edit

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    // Shared infrastructure
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, MaterialsEvent};
    use shared_types::{
        IndicatorStatus, Material, MaterialStatus, Project, ProjectId, ProjectStatus, UserRef,
    };

    // Material sync subsystem
    use lc_01_material_sync::{
        apply_transition, AuthContext, BusPublisher, ChangeContext, MaterialRemote,
        MaterialStatusApi, MaterialStatusManager, MaterialStatusUpdate, MaterialSyncError,
        NoOpPublisher, OptimisticStore, RefetchOutcome, RefreshListener, RemoteError,
        StaticAuthProvider, SyncConfig,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Backend with per-call gates, so a test can observe the in-flight window.
    #[derive(Default)]
    struct ShopBackend {
        projects: Mutex<Vec<Project>>,
        update_gates: Vec<Arc<Notify>>,
        fetch_gates: Vec<Arc<Notify>>,
        failing_updates: Vec<usize>,
        update_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
    }

    impl ShopBackend {
        fn new() -> Self {
            Self {
                projects: Mutex::new(shop_floor()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl MaterialRemote for ShopBackend {
        async fn update_material_status(
            &self,
            _auth: &AuthContext,
            update: &MaterialStatusUpdate,
        ) -> Result<(), RemoteError> {
            let call = self.update_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = self.update_gates.get(call) {
                gate.notified().await;
            }
            if self.failing_updates.contains(&call) {
                return Err(RemoteError::Server {
                    status: 500,
                    message: "Database unavailable".into(),
                });
            }
            let acting = UserRef::new(update.acting_user_id, "operator");
            for project in self.projects.lock().iter_mut() {
                if let Some(material) = project.material_mut(update.material_id) {
                    apply_transition(material, update.status, &acting, Utc::now());
                }
            }
            Ok(())
        }

        async fn fetch_projects(&self, _auth: &AuthContext) -> Result<Vec<Project>, RemoteError> {
            let call = self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            // Response content is fixed when the request is served.
            let response = self.projects.lock().clone();
            if let Some(gate) = self.fetch_gates.get(call) {
                gate.notified().await;
            }
            Ok(response)
        }

        async fn update_project_status(
            &self,
            _auth: &AuthContext,
            project_id: ProjectId,
            status: ProjectStatus,
        ) -> Result<(), RemoteError> {
            if let Some(project) = self.projects.lock().iter_mut().find(|p| p.id == project_id) {
                project.status = status;
            }
            Ok(())
        }
    }

    fn shop_floor() -> Vec<Project> {
        vec![
            Project {
                id: 1,
                name: "Bracket run".into(),
                materials: vec![Material::new(10, 1, 100), Material::new(11, 1, 101)],
                ..Project::default()
            },
            Project {
                id: 2,
                name: "Gate panels".into(),
                materials: vec![Material::new(20, 2, 100)],
                ..Project::default()
            },
        ]
    }

    fn operator() -> UserRef {
        UserRef::new(7, "operator")
    }

    fn auth() -> Arc<StaticAuthProvider> {
        Arc::new(StaticAuthProvider::new("token", operator()))
    }

    async fn until(condition: impl Fn() -> bool) {
        while !condition() {
            tokio::task::yield_now().await;
        }
    }

    // =============================================================================
    // OPTIMISTIC CHANGE AND ROLLBACK
    // =============================================================================

    #[tokio::test]
    async fn test_optimistic_change_then_failed_change_rolls_back() {
        let gates = vec![Arc::new(Notify::new()), Arc::new(Notify::new())];
        let backend = Arc::new(ShopBackend {
            update_gates: gates.clone(),
            failing_updates: vec![1],
            ..ShopBackend::new()
        });
        let store = OptimisticStore::with_projects(shop_floor());
        let manager = Arc::new(MaterialStatusManager::new(
            store.clone(),
            backend.clone(),
            auth(),
            NoOpPublisher,
            SyncConfig::default(),
        ));

        // First change: pending -> in_progress, succeeds.
        let worker = manager.clone();
        let first = tokio::spawn(async move {
            worker
                .change_status(1, 100, MaterialStatus::InProgress, ChangeContext::new())
                .await
        });
        until(|| backend.update_calls.load(Ordering::SeqCst) == 1).await;

        let in_flight = store.material_by_spec(1, 100).unwrap();
        assert_eq!(in_flight.status, MaterialStatus::InProgress);
        assert_eq!(
            in_flight.start_date.map(|d| d.date_naive()),
            Some(Utc::now().date_naive())
        );

        gates[0].notify_one();
        first.await.unwrap().unwrap();

        let committed = store.material_by_spec(1, 100).unwrap();
        assert_eq!(committed.status, MaterialStatus::InProgress);
        let started = committed.start_date;
        assert!(started.is_some());

        // Second change: in_progress -> completed, backend fails.
        let worker = manager.clone();
        let second = tokio::spawn(async move {
            worker
                .change_status(1, 100, MaterialStatus::Completed, ChangeContext::new())
                .await
        });
        until(|| backend.update_calls.load(Ordering::SeqCst) == 2).await;

        let in_flight = store.material_by_spec(1, 100).unwrap();
        assert_eq!(in_flight.status, MaterialStatus::Completed);
        assert_eq!(in_flight.completed_by, Some(operator()));
        assert!(in_flight.completed_date.is_some());

        gates[1].notify_one();
        let err = second.await.unwrap().unwrap_err();
        assert_eq!(
            err,
            MaterialSyncError::Server {
                status: 500,
                message: "Database unavailable".into()
            }
        );

        let restored = store.material_by_spec(1, 100).unwrap();
        assert_eq!(restored.status, MaterialStatus::InProgress);
        assert_eq!(restored.start_date, started);
        assert!(restored.completed_date.is_none());
        assert!(restored.completed_by.is_none());
        assert!(!store.is_transitioning());
    }

    #[tokio::test]
    async fn test_failed_change_leaves_other_materials_alone() {
        let backend = Arc::new(ShopBackend {
            failing_updates: vec![0],
            ..ShopBackend::new()
        });
        let store = OptimisticStore::with_projects(shop_floor());
        let manager = MaterialStatusManager::new(
            store.clone(),
            backend,
            auth(),
            NoOpPublisher,
            SyncConfig::default(),
        );
        let before = store.projects();

        let result = manager
            .change_status(2, 100, MaterialStatus::InProgress, ChangeContext::new())
            .await;

        assert!(result.is_err());
        assert_eq!(store.projects(), before);
    }

    // =============================================================================
    // CROSS-VIEW NOTIFICATION
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_committed_change_reaches_every_view() {
        let bus = Arc::new(InMemoryEventBus::new());
        let backend = Arc::new(ShopBackend::new());
        let auth = auth();

        // View A patches itself from the event payload.
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _view_a = bus.on(EventTopic::MaterialsUpdated, move |event| {
            if let Some(change) = event.change() {
                sink.lock().push((change.material_id, change.status));
            }
        });

        // View B keeps its own copy and re-reads on notification.
        let view_b = OptimisticStore::with_projects(shop_floor());
        let listener = RefreshListener::spawn(
            &bus,
            view_b.clone(),
            backend.clone(),
            auth.clone(),
            NoOpPublisher,
            Duration::from_millis(300),
        );

        let manager = MaterialStatusManager::new(
            OptimisticStore::with_projects(shop_floor()),
            backend,
            auth,
            BusPublisher::new(bus.clone()),
            SyncConfig::default(),
        );
        manager
            .change_status(2, 100, MaterialStatus::InProgress, ChangeContext::new())
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![(20, MaterialStatus::InProgress)]);
        assert_eq!(view_b.indicator_status(2, 100), IndicatorStatus::Pending);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(view_b.indicator_status(2, 100), IndicatorStatus::InProgress);
        assert_eq!(listener.refreshes(), 1);
    }

    #[tokio::test]
    async fn test_project_filtered_stream_sees_full_lifecycle() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut project_two = bus.subscribe(EventFilter::for_projects(vec![2]));
        let mut project_one = bus.subscribe(EventFilter::for_projects(vec![1]));

        let manager = MaterialStatusManager::new(
            OptimisticStore::with_projects(shop_floor()),
            Arc::new(ShopBackend::new()),
            auth(),
            BusPublisher::new(bus.clone()),
            SyncConfig::default(),
        );
        manager
            .change_status(2, 100, MaterialStatus::InProgress, ChangeContext::new())
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Ok(Some(event)) = project_two.try_recv() {
            received.push(event);
        }
        assert!(matches!(received[0], MaterialsEvent::StatusApplied(_)));
        assert!(matches!(received[1], MaterialsEvent::StoreRefreshed { .. }));
        assert!(matches!(received[2], MaterialsEvent::MaterialsUpdated(_)));
        assert_eq!(received.len(), 3);

        // Refreshes carry no project and reach every filter.
        assert!(matches!(
            project_one.try_recv(),
            Ok(Some(MaterialsEvent::StoreRefreshed { .. }))
        ));
        assert!(matches!(project_one.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_commit_refetch_keeps_other_material_in_flight() {
        let held_gate = Arc::new(Notify::new());
        let backend = Arc::new(ShopBackend {
            update_gates: vec![held_gate.clone()],
            ..ShopBackend::new()
        });
        let store = OptimisticStore::with_projects(shop_floor());
        let manager = Arc::new(MaterialStatusManager::new(
            store.clone(),
            backend.clone(),
            auth(),
            NoOpPublisher,
            SyncConfig::default(),
        ));

        // Material 11 is applied locally and stuck in its PUT.
        let worker = manager.clone();
        let slow = tokio::spawn(async move {
            worker
                .change_status(1, 101, MaterialStatus::InProgress, ChangeContext::new())
                .await
        });
        until(|| backend.update_calls.load(Ordering::SeqCst) == 1).await;
        assert_eq!(store.indicator_status(1, 101), IndicatorStatus::InProgress);

        // Material 10 commits and refetches while the server still has 11 pending.
        manager
            .change_status(1, 100, MaterialStatus::InProgress, ChangeContext::new())
            .await
            .unwrap();
        assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.indicator_status(1, 100), IndicatorStatus::InProgress);
        assert_eq!(store.indicator_status(1, 101), IndicatorStatus::InProgress);
        assert!(store.is_held(11));

        held_gate.notify_one();
        slow.await.unwrap().unwrap();

        assert!(!store.is_held(11));
        assert_eq!(store.indicator_status(1, 101), IndicatorStatus::InProgress);
        assert_eq!(store.indicator_status(1, 100), IndicatorStatus::InProgress);
    }

    // =============================================================================
    // STALE REFETCH
    // =============================================================================

    #[tokio::test]
    async fn test_refetch_issued_before_edit_keeps_the_edit() {
        let stale_gate = Arc::new(Notify::new());
        let backend = Arc::new(ShopBackend {
            fetch_gates: vec![stale_gate.clone()],
            ..ShopBackend::new()
        });
        let store = OptimisticStore::with_projects(shop_floor());
        let manager = Arc::new(MaterialStatusManager::new(
            store.clone(),
            backend.clone(),
            auth(),
            NoOpPublisher,
            SyncConfig::default(),
        ));

        // A background refresh is served before the edit, delivered after.
        let worker = manager.clone();
        let refresh = tokio::spawn(async move { worker.refresh().await });
        until(|| backend.fetch_calls.load(Ordering::SeqCst) == 1).await;

        manager
            .change_status(1, 101, MaterialStatus::InProgress, ChangeContext::new())
            .await
            .unwrap();
        assert_eq!(store.indicator_status(1, 101), IndicatorStatus::InProgress);

        stale_gate.notify_one();
        let outcome = refresh.await.unwrap().unwrap();

        assert!(matches!(outcome, RefetchOutcome::Stale { .. }));
        assert_eq!(store.indicator_status(1, 101), IndicatorStatus::InProgress);
    }

    #[tokio::test]
    async fn test_api_trait_object_drives_the_cycle() {
        let manager = MaterialStatusManager::new(
            OptimisticStore::with_projects(shop_floor()),
            Arc::new(ShopBackend::new()),
            auth(),
            NoOpPublisher,
            SyncConfig::default(),
        );
        let api: Arc<dyn MaterialStatusApi> = Arc::new(manager);

        let mut statuses = Vec::new();
        for _ in 0..4 {
            statuses.push(
                api.advance_status(1, 100, ChangeContext::new())
                    .await
                    .unwrap()
                    .status,
            );
        }

        assert_eq!(
            statuses,
            vec![
                MaterialStatus::InProgress,
                MaterialStatus::Completed,
                MaterialStatus::Pending,
                MaterialStatus::InProgress,
            ]
        );
        assert_eq!(api.material_status(1, 100), IndicatorStatus::InProgress);
        assert_eq!(api.material_status(1, 999), IndicatorStatus::Empty);
    }
}
