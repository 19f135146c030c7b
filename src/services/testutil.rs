//! In-memory collaborator doubles shared by the service tests

use crate::domain::error::{NotifyError, ProviderError, StoreError};
use crate::domain::types::{
    GeoPoint, Geofence, GeofenceEvent, GeofenceId, GpsPoint, JourneyId, LocationFix, Transition,
};
use crate::io::location::{FixStream, LocationProvider, SubscriptionProfile};
use crate::io::notifier::Notifier;
use crate::io::store::TripStore;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Build a fix at the given coordinates with nominal accuracy
pub(crate) fn fix(latitude: f64, longitude: f64) -> LocationFix {
    LocationFix { point: GeoPoint::new(latitude, longitude), accuracy_m: 5.0, timestamp: Utc::now() }
}

/// A point `meters` north of `origin` (one degree of latitude is ~111.2 km)
pub(crate) fn north_of(origin: GeoPoint, meters: f64) -> GeoPoint {
    GeoPoint::new(origin.latitude + meters / 111_195.0, origin.longitude)
}

pub(crate) fn fence(id: i64, name: &str, center: GeoPoint, radius_m: f64) -> Geofence {
    Geofence { id: GeofenceId(id), name: name.to_string(), center, radius_m }
}

/// Recording in-memory store with per-operation failure switches
#[derive(Default)]
pub(crate) struct MemStore {
    pub geofences: Mutex<Vec<Geofence>>,
    pub events: Mutex<Vec<GeofenceEvent>>,
    pub points: Mutex<Vec<GpsPoint>>,
    pub completed: Mutex<Vec<(JourneyId, f64)>>,
    pub fail_geofence_reads: AtomicBool,
    pub fail_event_writes: AtomicBool,
    pub fail_gps_writes: AtomicBool,
    pub fail_end_journey: AtomicBool,
}

impl MemStore {
    pub fn with_geofences(fences: Vec<Geofence>) -> Self {
        let store = Self::default();
        *store.geofences.lock() = fences;
        store
    }
}

#[async_trait]
impl TripStore for MemStore {
    async fn geofences(&self) -> Result<Vec<Geofence>, StoreError> {
        if self.fail_geofence_reads.load(Ordering::SeqCst) {
            return Err(StoreError::new("geofence read refused"));
        }
        Ok(self.geofences.lock().clone())
    }

    async fn add_geofence_event(&self, event: &GeofenceEvent) -> Result<(), StoreError> {
        if self.fail_event_writes.load(Ordering::SeqCst) {
            return Err(StoreError::new("event write refused"));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }

    async fn latest_geofence_event(
        &self,
        geofence_id: GeofenceId,
    ) -> Result<Option<GeofenceEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .iter()
            .filter(|e| e.geofence_id == geofence_id)
            .last()
            .cloned())
    }

    async fn add_gps_point(&self, point: &GpsPoint) -> Result<(), StoreError> {
        if self.fail_gps_writes.load(Ordering::SeqCst) {
            return Err(StoreError::new("gps write refused"));
        }
        self.points.lock().push(*point);
        Ok(())
    }

    async fn end_journey(
        &self,
        journey_id: JourneyId,
        total_distance_m: f64,
    ) -> Result<(), StoreError> {
        if self.fail_end_journey.load(Ordering::SeqCst) {
            return Err(StoreError::new("end journey refused"));
        }
        self.completed.lock().push((journey_id, total_distance_m));
        Ok(())
    }
}

/// Recording notifier with a failure switch
#[derive(Default)]
pub(crate) struct MemNotifier {
    pub sent: Mutex<Vec<(String, Transition)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Notifier for MemNotifier {
    async fn notify_geofence(
        &self,
        geofence_name: &str,
        transition: Transition,
    ) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::new("dispatch refused"));
        }
        self.sent.lock().push((geofence_name.to_string(), transition));
        Ok(())
    }
}

/// Provider double: scripted single-shot fix, inert subscriptions
///
/// Tests drive the services by calling `handle_fix` directly; the
/// subscription senders are parked here so the streams stay open.
pub(crate) struct ScriptedProvider {
    pub permission: AtomicBool,
    pub current: Mutex<Option<LocationFix>>,
    pub subscriptions: Mutex<Vec<mpsc::Sender<LocationFix>>>,
}

impl ScriptedProvider {
    pub fn with_current(fix: LocationFix) -> Self {
        Self {
            permission: AtomicBool::new(true),
            current: Mutex::new(Some(fix)),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn without_fix() -> Self {
        Self {
            permission: AtomicBool::new(true),
            current: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn set_current(&self, fix: LocationFix) {
        *self.current.lock() = Some(fix);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

#[async_trait]
impl LocationProvider for ScriptedProvider {
    async fn permission_granted(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    async fn current_fix(&self) -> Result<LocationFix, ProviderError> {
        let current = *self.current.lock();
        current.ok_or_else(|| ProviderError::new("no fix scripted"))
    }

    async fn subscribe(&self, _profile: SubscriptionProfile) -> Result<FixStream, ProviderError> {
        let (tx, stream) = FixStream::channel(16);
        self.subscriptions.lock().push(tx);
        Ok(stream)
    }
}
