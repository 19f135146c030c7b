//! OS geofencing callback bridge
//!
//! The platform's native geofencing primitive wakes the app with a region
//! transition even when nothing else is running, possibly in a fresh process.
//! This bridge owns that entry point: collaborators are initialized lazily
//! exactly once per cold start, the geofence snapshot is re-read on every
//! invocation, and no error of any kind escapes past the OS boundary.
//!
//! The native path and the in-app monitor detect crossings independently;
//! a transition already logged moments ago by either path is suppressed
//! here instead of being recorded twice.

use crate::domain::error::{InitError, StoreError};
use crate::domain::types::{GeofenceEvent, GeofenceId, Transition};
use crate::io::notifier::Notifier;
use crate::io::store::TripStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

/// Window within which an identical-type event for the same geofence is
/// treated as the same real-world crossing
const DEDUP_WINDOW_SECS: i64 = 30;

/// Label used when the geofence was deleted after the OS registration
const FALLBACK_AREA_LABEL: &str = "an area";

/// Collaborators the bridge resolves on first use
pub struct BridgeServices {
    pub store: Arc<dyn TripStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// Builds the bridge's collaborators in a possibly fresh process
#[async_trait]
pub trait CollaboratorInit: Send + Sync {
    async fn init(&self) -> Result<BridgeServices, InitError>;
}

#[derive(Debug, Error)]
enum BridgeError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error("region identifier {0:?} is not a geofence id")]
    BadRegion(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Entry point registered with the OS geofencing API
pub struct GeofenceTaskBridge {
    init: Arc<dyn CollaboratorInit>,
    services: OnceCell<BridgeServices>,
}

impl GeofenceTaskBridge {
    pub fn new(init: Arc<dyn CollaboratorInit>) -> Self {
        Self { init, services: OnceCell::new() }
    }

    /// Handle one OS-delivered region transition
    ///
    /// Never returns an error: a failure here would crash the wake-up
    /// handler and silently break future background delivery.
    pub async fn handle(&self, transition: Transition, region_identifier: &str) {
        if let Err(e) = self.try_handle(transition, region_identifier).await {
            error!(
                region = %region_identifier,
                transition = %transition,
                error = %e,
                "background_geofence_task_failed"
            );
        }
    }

    async fn try_handle(
        &self,
        transition: Transition,
        region_identifier: &str,
    ) -> Result<(), BridgeError> {
        let services = self.services.get_or_try_init(|| self.init.init()).await?;

        let geofence_id = region_identifier
            .parse::<i64>()
            .map(GeofenceId)
            .map_err(|_| BridgeError::BadRegion(region_identifier.to_string()))?;

        if let Some(previous) = services.store.latest_geofence_event(geofence_id).await? {
            let age = Utc::now().signed_duration_since(previous.timestamp);
            if previous.transition == transition
                && age.num_seconds() >= 0
                && age.num_seconds() < DEDUP_WINDOW_SECS
            {
                info!(
                    geofence_id = %geofence_id,
                    transition = %transition,
                    age_s = %age.num_seconds(),
                    "duplicate_transition_suppressed"
                );
                return Ok(());
            }
        }

        let event = GeofenceEvent { geofence_id, transition, timestamp: Utc::now() };
        services.store.add_geofence_event(&event).await?;

        // The snapshot is re-read every invocation: arbitrary time may have
        // passed since last launch and the geofence may be gone
        let name = match services.store.geofences().await {
            Ok(fences) => fences.into_iter().find(|f| f.id == geofence_id).map(|f| f.name),
            Err(e) => {
                warn!(geofence_id = %geofence_id, error = %e, "geofence_lookup_failed");
                None
            }
        };
        let name = name.unwrap_or_else(|| FALLBACK_AREA_LABEL.to_string());

        if let Err(e) = services.notifier.notify_geofence(&name, transition).await {
            warn!(geofence_id = %geofence_id, error = %e, "geofence_notification_failed");
        }

        info!(
            geofence_id = %geofence_id,
            name = %name,
            transition = %transition,
            "background_geofence_event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::GeoPoint;
    use crate::services::testutil::{fence, MemNotifier, MemStore};
    use chrono::Duration;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct TestInit {
        store: Arc<MemStore>,
        notifier: Arc<MemNotifier>,
        calls: AtomicUsize,
        fail_first: AtomicBool,
    }

    impl TestInit {
        fn new(store: Arc<MemStore>, notifier: Arc<MemNotifier>) -> Self {
            Self { store, notifier, calls: AtomicUsize::new(0), fail_first: AtomicBool::new(false) }
        }
    }

    #[async_trait]
    impl CollaboratorInit for TestInit {
        async fn init(&self) -> Result<BridgeServices, InitError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 && self.fail_first.load(Ordering::SeqCst) {
                return Err(InitError::new("cold start refused"));
            }
            Ok(BridgeServices { store: self.store.clone(), notifier: self.notifier.clone() })
        }
    }

    struct TestBridge {
        bridge: GeofenceTaskBridge,
        store: Arc<MemStore>,
        notifier: Arc<MemNotifier>,
        init: Arc<TestInit>,
    }

    fn create_test_bridge() -> TestBridge {
        let store = Arc::new(MemStore::with_geofences(vec![fence(
            1,
            "Casa",
            GeoPoint::new(45.0, 9.0),
            100.0,
        )]));
        let notifier = Arc::new(MemNotifier::default());
        let init = Arc::new(TestInit::new(store.clone(), notifier.clone()));
        let bridge = GeofenceTaskBridge::new(init.clone());
        TestBridge { bridge, store, notifier, init }
    }

    #[tokio::test]
    async fn test_persists_and_notifies() {
        let t = create_test_bridge();

        t.bridge.handle(Transition::Entry, "1").await;

        let events = t.store.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].geofence_id, GeofenceId(1));
        assert_eq!(events[0].transition, Transition::Entry);

        let sent = t.notifier.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], ("Casa".to_string(), Transition::Entry));
    }

    #[tokio::test]
    async fn test_deleted_geofence_uses_fallback_label() {
        let t = create_test_bridge();
        t.store.geofences.lock().clear();

        t.bridge.handle(Transition::Exit, "1").await;

        // the event is still logged even though the fence is gone
        assert_eq!(t.store.events.lock().len(), 1);
        assert_eq!(t.notifier.sent.lock()[0].0, "an area");
    }

    #[tokio::test]
    async fn test_malformed_region_identifier_is_ignored() {
        let t = create_test_bridge();

        t.bridge.handle(Transition::Entry, "not-a-number").await;

        assert!(t.store.events.lock().is_empty());
        assert!(t.notifier.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_collaborators_initialized_once() {
        let t = create_test_bridge();

        t.bridge.handle(Transition::Entry, "1").await;
        t.bridge.handle(Transition::Exit, "1").await;
        t.bridge.handle(Transition::Entry, "1").await;

        assert_eq!(t.init.calls.load(Ordering::SeqCst), 1);
        assert_eq!(t.store.events.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_init_retries_next_invocation() {
        let t = create_test_bridge();
        t.init.fail_first.store(true, Ordering::SeqCst);

        t.bridge.handle(Transition::Entry, "1").await;
        assert!(t.store.events.lock().is_empty());

        t.bridge.handle(Transition::Entry, "1").await;
        assert_eq!(t.store.events.lock().len(), 1);
        assert_eq!(t.init.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_duplicate_within_window_suppressed() {
        let t = create_test_bridge();

        t.bridge.handle(Transition::Entry, "1").await;
        // the redundant path reports the same crossing moments later
        t.bridge.handle(Transition::Entry, "1").await;

        assert_eq!(t.store.events.lock().len(), 1);
        assert_eq!(t.notifier.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_opposite_transition_not_suppressed() {
        let t = create_test_bridge();

        t.bridge.handle(Transition::Entry, "1").await;
        t.bridge.handle(Transition::Exit, "1").await;

        assert_eq!(t.store.events.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_event_not_suppressed() {
        let t = create_test_bridge();
        t.store.events.lock().push(GeofenceEvent {
            geofence_id: GeofenceId(1),
            transition: Transition::Entry,
            timestamp: Utc::now() - Duration::seconds(60),
        });

        t.bridge.handle(Transition::Entry, "1").await;

        assert_eq!(t.store.events.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_never_escapes() {
        let t = create_test_bridge();
        t.store.fail_event_writes.store(true, Ordering::SeqCst);

        // must not panic or propagate
        t.bridge.handle(Transition::Entry, "1").await;

        assert!(t.store.events.lock().is_empty());
        // persistence comes first; on its failure no notification goes out
        assert!(t.notifier.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_notify_failure_keeps_event() {
        let t = create_test_bridge();
        t.notifier.fail.store(true, Ordering::SeqCst);

        t.bridge.handle(Transition::Entry, "1").await;

        assert_eq!(t.store.events.lock().len(), 1);
        assert!(t.notifier.sent.lock().is_empty());
    }
}
