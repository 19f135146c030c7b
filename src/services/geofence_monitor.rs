//! Geofence transition monitoring
//!
//! Holds a snapshot of circular regions and evaluates every accepted fix
//! against each of them. A region's first observation seeds its state from
//! the current position, so monitoring never opens with a spurious event;
//! afterwards only a real boundary crossing emits Entry or Exit.
//!
//! Region state is in-memory only and lost on process restart: a crossing
//! that happens while nothing is running is never detected retroactively.

use crate::domain::error::MonitorError;
use crate::domain::geo;
use crate::domain::types::{GeoPoint, Geofence, GeofenceEvent, GeofenceId, LocationFix, Transition};
use crate::infra::config::Config;
use crate::io::location::{LocationProvider, SubscriptionProfile};
use crate::io::notifier::Notifier;
use crate::io::store::TripStore;
use crate::services::pump::FixPump;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Per-geofence transient state, never persisted
struct RegionState {
    was_inside: bool,
    #[allow(dead_code)]
    last_distance_m: f64,
}

#[derive(Default)]
struct MonitorState {
    monitoring: bool,
    geofences: Vec<Geofence>,
    regions: HashMap<GeofenceId, RegionState>,
    last_check: Option<Instant>,
}

/// State and collaborators shared with the pump task
struct MonitorCore {
    store: Arc<dyn TripStore>,
    notifier: Arc<dyn Notifier>,
    /// Fixes closer together than this are dropped before evaluation
    min_check_interval: Duration,
    state: Mutex<MonitorState>,
}

impl MonitorCore {
    async fn handle_fix(&self, fix: LocationFix) {
        let fences = {
            let mut state = self.state.lock();
            if !state.monitoring {
                return;
            }

            let now = Instant::now();
            if let Some(last) = state.last_check {
                if now.duration_since(last) < self.min_check_interval {
                    debug!("fix_rate_limited");
                    return;
                }
            }
            state.last_check = Some(now);
            state.geofences.clone()
        };

        // One region's failure never blocks evaluation of the others
        for fence in &fences {
            self.evaluate(fence, fix.point).await;
        }
    }

    async fn evaluate(&self, fence: &Geofence, position: GeoPoint) {
        let distance = geo::haversine_distance_m(position, fence.center);
        // a point exactly on the boundary counts as inside
        let inside = distance <= fence.radius_m;

        let transition = {
            let mut state = self.state.lock();
            match state.regions.get_mut(&fence.id) {
                None => {
                    // First observation (e.g. the fence appeared after
                    // monitoring started): seed without an event
                    state.regions.insert(
                        fence.id,
                        RegionState { was_inside: inside, last_distance_m: distance },
                    );
                    None
                }
                Some(region) => {
                    let was_inside = region.was_inside;
                    region.was_inside = inside;
                    region.last_distance_m = distance;
                    match (was_inside, inside) {
                        (true, false) => Some(Transition::Exit),
                        (false, true) => Some(Transition::Entry),
                        _ => None,
                    }
                }
            }
        };

        if let Some(transition) = transition {
            self.emit(fence, transition, distance).await;
        }
    }

    /// Persist the event and dispatch the notification independently;
    /// neither failure suppresses the other
    async fn emit(&self, fence: &Geofence, transition: Transition, distance_m: f64) {
        info!(
            geofence_id = %fence.id,
            name = %fence.name,
            transition = %transition,
            distance_m = %distance_m,
            "geofence_transition"
        );

        let event =
            GeofenceEvent { geofence_id: fence.id, transition, timestamp: Utc::now() };
        if let Err(e) = self.store.add_geofence_event(&event).await {
            error!(geofence_id = %fence.id, error = %e, "geofence_event_write_failed");
        }

        if let Err(e) = self.notifier.notify_geofence(&fence.name, transition).await {
            warn!(geofence_id = %fence.id, error = %e, "geofence_notification_failed");
        }
    }

    fn seed(&self, seed_point: GeoPoint, fences: &[Geofence], replace: bool) {
        let mut state = self.state.lock();
        for fence in fences {
            if !replace && state.regions.contains_key(&fence.id) {
                continue;
            }
            let distance = geo::haversine_distance_m(seed_point, fence.center);
            state.regions.insert(
                fence.id,
                RegionState { was_inside: distance <= fence.radius_m, last_distance_m: distance },
            );
        }
    }
}

/// Watches the configured geofences over a live fix subscription
pub struct GeofenceMonitor {
    core: Arc<MonitorCore>,
    provider: Arc<dyn LocationProvider>,
    pump: Mutex<Option<FixPump>>,
}

impl GeofenceMonitor {
    pub fn new(
        config: &Config,
        store: Arc<dyn TripStore>,
        notifier: Arc<dyn Notifier>,
        provider: Arc<dyn LocationProvider>,
    ) -> Self {
        Self {
            core: Arc::new(MonitorCore {
                store,
                notifier,
                min_check_interval: config.min_check_interval(),
                state: Mutex::new(MonitorState::default()),
            }),
            provider,
            pump: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_min_check_interval(&mut self, interval: Duration) {
        Arc::get_mut(&mut self.core)
            .expect("monitor already shared")
            .min_check_interval = interval;
    }

    #[cfg(test)]
    pub(crate) fn region_distance(&self, id: GeofenceId) -> Option<f64> {
        self.core.state.lock().regions.get(&id).map(|r| r.last_distance_m)
    }

    /// Begin monitoring the configured geofences
    ///
    /// Returns `Ok(false)` when location permission is missing or no
    /// geofences are configured; neither is an error. Initial state for every
    /// region is seeded from one fresh fix without emitting events.
    pub async fn start_monitoring(&self) -> Result<bool, MonitorError> {
        if !self.provider.permission_granted().await {
            info!("monitoring_not_started_permission_denied");
            return Ok(false);
        }

        let fences = self.core.store.geofences().await?;
        if fences.is_empty() {
            info!("monitoring_not_started_no_geofences");
            return Ok(false);
        }

        let seed = self.provider.current_fix().await?;
        {
            let mut state = self.core.state.lock();
            state.geofences = fences.clone();
            state.regions.clear();
            state.last_check = None;
        }
        self.core.seed(seed.point, &fences, true);

        let stream = self.provider.subscribe(SubscriptionProfile::monitoring()).await?;
        self.core.state.lock().monitoring = true;

        let core = Arc::clone(&self.core);
        let pump = FixPump::spawn(stream, move |fix| {
            let core = Arc::clone(&core);
            async move { core.handle_fix(fix).await }
        });
        *self.pump.lock() = Some(pump);

        info!(geofences = %fences.len(), "monitoring_started");
        Ok(true)
    }

    /// Process one location fix; rate-limited, a no-op while not monitoring
    ///
    /// Normally driven by the subscription pump.
    pub async fn handle_fix(&self, fix: LocationFix) {
        self.core.handle_fix(fix).await;
    }

    /// Re-fetch the geofence snapshot after a create or delete
    ///
    /// Regions that already have state keep it; regions new to the snapshot
    /// are seeded from one fresh fix without emitting events. When that fix
    /// is unavailable the new regions seed lazily on the next evaluated fix.
    pub async fn reload_geofences(&self) -> Result<(), MonitorError> {
        let fences = self.core.store.geofences().await?;

        let (monitoring, unseeded) = {
            let mut state = self.core.state.lock();
            state.geofences = fences;
            let unseeded: Vec<Geofence> = state
                .geofences
                .iter()
                .filter(|f| !state.regions.contains_key(&f.id))
                .cloned()
                .collect();
            (state.monitoring, unseeded)
        };

        info!(unseeded = %unseeded.len(), "geofences_reloaded");
        if !monitoring || unseeded.is_empty() {
            return Ok(());
        }

        match self.provider.current_fix().await {
            Ok(seed) => self.core.seed(seed.point, &unseeded, false),
            Err(e) => warn!(error = %e, "reload_seed_fix_unavailable"),
        }
        Ok(())
    }

    /// Stop monitoring; fixes delivered afterwards are discarded
    pub fn stop_monitoring(&self) {
        {
            let mut state = self.core.state.lock();
            if !state.monitoring {
                return;
            }
            state.monitoring = false;
            state.last_check = None;
        }

        if let Some(pump) = self.pump.lock().take() {
            pump.shutdown();
        }
        info!("monitoring_stopped");
    }

    pub fn is_monitoring(&self) -> bool {
        self.core.state.lock().monitoring
    }
}
