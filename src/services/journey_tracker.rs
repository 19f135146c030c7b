//! Journey tracking and distance accumulation
//!
//! Consumes a stream of location fixes while a journey is active. Every fix
//! is persisted as a raw trace sample; only plausible steps contribute to the
//! accumulated distance. At most one journey is active at a time.

use crate::domain::error::TrackerError;
use crate::domain::geo;
use crate::domain::types::{GeoPoint, GpsPoint, JourneyId, LocationFix, TrackingStatus};
use crate::infra::config::Config;
use crate::io::location::{LocationProvider, SubscriptionProfile};
use crate::io::store::TripStore;
use crate::services::pump::FixPump;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Default)]
struct TrackingState {
    journey_id: Option<JourneyId>,
    last_location: Option<GeoPoint>,
    total_distance_m: f64,
}

impl TrackingState {
    fn reset(&mut self) {
        self.journey_id = None;
        self.last_location = None;
        self.total_distance_m = 0.0;
    }
}

/// State and persistence shared with the pump task
struct TrackerCore {
    store: Arc<dyn TripStore>,
    /// Steps below this are GPS jitter, not movement
    min_step_m: f64,
    /// Steps above this are implausible at the subscription cadence
    max_step_m: f64,
    state: Mutex<TrackingState>,
}

impl TrackerCore {
    async fn handle_fix(&self, fix: LocationFix) {
        let journey_id = {
            let state = self.state.lock();
            match state.journey_id {
                Some(id) => id,
                // idle, fix discarded
                None => return,
            }
        };

        // The raw trace is persisted even for fixes the accumulator rejects,
        // and a failed write must not abort tracking
        let point = GpsPoint {
            journey_id,
            point: fix.point,
            accuracy_m: fix.accuracy_m,
            timestamp: fix.timestamp,
        };
        if let Err(e) = self.store.add_gps_point(&point).await {
            warn!(journey_id = %journey_id, error = %e, "gps_point_write_failed");
        }

        let mut state = self.state.lock();
        if state.journey_id != Some(journey_id) {
            // stopped while the write was in flight
            return;
        }

        if let Some(last) = state.last_location {
            let step = geo::haversine_distance_m(last, fix.point);
            if (self.min_step_m..=self.max_step_m).contains(&step) {
                state.total_distance_m += step;
            } else {
                debug!(journey_id = %journey_id, step_m = %step, "step_rejected");
            }
        }
        // The baseline moves to every fix, accepted or not, so one outlier
        // is never counted against two consecutive steps
        state.last_location = Some(fix.point);
    }
}

/// Tracks the active journey's distance over a live fix subscription
pub struct JourneyTracker {
    core: Arc<TrackerCore>,
    provider: Arc<dyn LocationProvider>,
    pump: Mutex<Option<FixPump>>,
}

impl JourneyTracker {
    pub fn new(
        config: &Config,
        store: Arc<dyn TripStore>,
        provider: Arc<dyn LocationProvider>,
    ) -> Self {
        Self {
            core: Arc::new(TrackerCore {
                store,
                min_step_m: config.min_step_m(),
                max_step_m: config.max_step_m(),
                state: Mutex::new(TrackingState::default()),
            }),
            provider,
            pump: Mutex::new(None),
        }
    }

    /// Start recording a journey
    ///
    /// If a journey is already being tracked, the full stop sequence runs
    /// first, so at most one journey is ever active.
    pub async fn start_tracking(&self, journey_id: JourneyId) -> Result<(), TrackerError> {
        if self.status().is_tracking {
            self.stop_tracking().await?;
        }

        {
            let mut state = self.core.state.lock();
            state.journey_id = Some(journey_id);
            state.last_location = None;
            state.total_distance_m = 0.0;
        }

        let stream = match self.provider.subscribe(SubscriptionProfile::tracking()).await {
            Ok(stream) => stream,
            Err(e) => {
                self.core.state.lock().reset();
                return Err(TrackerError::Subscribe(e));
            }
        };

        let core = Arc::clone(&self.core);
        let pump = FixPump::spawn(stream, move |fix| {
            let core = Arc::clone(&core);
            async move { core.handle_fix(fix).await }
        });
        *self.pump.lock() = Some(pump);

        info!(journey_id = %journey_id, "tracking_started");
        Ok(())
    }

    /// Process one location fix; a no-op while idle
    ///
    /// Normally driven by the subscription pump.
    pub async fn handle_fix(&self, fix: LocationFix) {
        self.core.handle_fix(fix).await;
    }

    /// Stop recording and return the final accumulated distance
    ///
    /// The state flips to idle before anything else happens, so fixes still
    /// in flight are discarded. The journey is finalized in storage only when
    /// some distance was accumulated; that write's failure reaches the caller.
    pub async fn stop_tracking(&self) -> Result<f64, TrackerError> {
        let (journey_id, total) = {
            let mut state = self.core.state.lock();
            let id = state.journey_id;
            let total = state.total_distance_m;
            state.reset();
            (id, total)
        };

        if let Some(pump) = self.pump.lock().take() {
            pump.shutdown();
        }

        let Some(journey_id) = journey_id else {
            return Ok(0.0);
        };

        if total > 0.0 {
            self.core.store.end_journey(journey_id, total).await?;
        }

        info!(journey_id = %journey_id, total_distance_m = %total, "tracking_stopped");
        Ok(total)
    }

    /// Pure read of the current tracking state, safe at any time
    pub fn status(&self) -> TrackingStatus {
        let state = self.core.state.lock();
        TrackingStatus {
            is_tracking: state.journey_id.is_some(),
            journey_id: state.journey_id,
            total_distance_m: state.total_distance_m,
        }
    }
}
