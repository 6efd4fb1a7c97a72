//! Refresh-on-notify view adapter.
//!
//! Listens for `materials-updated` and re-reads the authoritative state
//! once the notifications stop arriving for the debounce period.

use crate::domain::RefetchOutcome;
use crate::ports::{AuthProvider, MaterialEventPublisher, MaterialRemote};
use crate::store::OptimisticStore;
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, MaterialsEvent, Subscription};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Background task refetching the store after update notifications.
///
/// The task stops when the listener is dropped or the bus is closed.
pub struct RefreshListener {
    handle: JoinHandle<()>,
    refreshes: Arc<AtomicU64>,
}

impl RefreshListener {
    /// Subscribes to `bus` and spawns the listener on the current runtime.
    pub fn spawn<R, A, P>(
        bus: &InMemoryEventBus,
        store: OptimisticStore,
        remote: R,
        auth: A,
        publisher: P,
        debounce: Duration,
    ) -> Self
    where
        R: MaterialRemote + 'static,
        A: AuthProvider + 'static,
        P: MaterialEventPublisher + 'static,
    {
        let subscription = bus.subscribe(EventFilter::topics(vec![EventTopic::MaterialsUpdated]));
        let refreshes = Arc::new(AtomicU64::new(0));
        let counter = refreshes.clone();

        let handle = tokio::spawn(async move {
            run(subscription, store, remote, auth, publisher, debounce, counter).await;
        });

        Self { handle, refreshes }
    }

    /// Number of refetches that completed (applied or stale).
    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Stops the listener. Dropping it has the same effect.
    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for RefreshListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run<R, A, P>(
    mut subscription: Subscription,
    store: OptimisticStore,
    remote: R,
    auth: A,
    publisher: P,
    debounce: Duration,
    refreshes: Arc<AtomicU64>,
) where
    R: MaterialRemote,
    A: AuthProvider,
    P: MaterialEventPublisher,
{
    while subscription.recv().await.is_some() {
        // Wait for a quiet period; each new notification restarts it.
        let mut closed = false;
        loop {
            match timeout(debounce, subscription.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        let Some(auth_context) = auth.current() else {
            debug!("Skipping refresh, not authenticated");
            if closed {
                break;
            }
            continue;
        };

        match store.refetch_all(&remote, &auth_context).await {
            Ok(outcome) => {
                refreshes.fetch_add(1, Ordering::Relaxed);
                if let RefetchOutcome::Applied {
                    version,
                    projects,
                    preserved,
                } = outcome
                {
                    publisher.publish(MaterialsEvent::StoreRefreshed {
                        version,
                        projects,
                        preserved,
                    });
                }
            }
            Err(e) => warn!(error = %e, "Refresh after update notification failed"),
        }

        if closed {
            break;
        }
    }
    debug!("Refresh listener stopped");
}
