//! Location fix acquisition
//!
//! `LocationProvider` models the platform location API: a single-shot
//! high-accuracy fix for seeding, and a continuous subscription the provider
//! filters to the requested cadence before fixes ever reach a consumer.
//! `ReplayProvider` plays a recorded JSONL trace through the same seam.

use crate::domain::error::ProviderError;
use crate::domain::geo;
use crate::domain::types::{GeoPoint, LocationFix};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Cadence hints a subscriber asks the provider to filter at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscriptionProfile {
    /// Deliver at least every this often while moving
    pub interval: Duration,
    /// Deliver whenever displacement since the last delivery reaches this
    pub distance_m: f64,
}

impl SubscriptionProfile {
    /// Journey recording cadence: 5 s or 10 m, whichever first
    pub const fn tracking() -> Self {
        Self { interval: Duration::from_secs(5), distance_m: 10.0 }
    }

    /// Geofence monitoring cadence: 5 s or 5 m, whichever first
    pub const fn monitoring() -> Self {
        Self { interval: Duration::from_secs(5), distance_m: 5.0 }
    }
}

/// A continuous stream of location fixes
///
/// Dropping the stream is the unsubscribe: the provider side stops as soon
/// as a send fails. Consumers additionally flip their own state before
/// dropping, so a fix already in flight is discarded, never queued.
pub struct FixStream {
    rx: mpsc::Receiver<LocationFix>,
}

impl FixStream {
    /// Create a sender/stream pair with the given channel capacity
    pub fn channel(capacity: usize) -> (mpsc::Sender<LocationFix>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }

    /// Next fix, or `None` once the provider side has finished
    pub async fn next(&mut self) -> Option<LocationFix> {
        self.rx.recv().await
    }
}

/// Platform location API seam
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Whether location permission has been granted to the app
    async fn permission_granted(&self) -> bool;

    /// One fresh high-accuracy fix (seeding); bounded by the platform's own
    /// acquisition timeout and surfaced as a failure to the caller
    async fn current_fix(&self) -> Result<LocationFix, ProviderError>;

    /// Continuous fix stream filtered to the requested cadence
    async fn subscribe(&self, profile: SubscriptionProfile) -> Result<FixStream, ProviderError>;
}

/// Plays back a recorded fix trace on a fixed tick
///
/// Each subscription replays the full trace independently, applying the
/// profile's interval/displacement filter the way the platform would. Time
/// is virtual: one tick of wall clock per trace sample.
pub struct ReplayProvider {
    fixes: Vec<LocationFix>,
    tick: Duration,
}

impl ReplayProvider {
    pub fn new(fixes: Vec<LocationFix>, tick: Duration) -> Self {
        Self { fixes, tick }
    }

    /// Load a trace from a JSONL file, one fix per line
    pub fn from_file(path: impl AsRef<Path>, tick: Duration) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ProviderError::new(format!("{}: {e}", path.display())))?;

        let mut fixes = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let fix: LocationFix = serde_json::from_str(line)
                .map_err(|e| ProviderError::new(format!("{}: {e}", path.display())))?;
            fixes.push(fix);
        }

        info!(file = %path.display(), fixes = %fixes.len(), "replay_trace_loaded");
        Ok(Self::new(fixes, tick))
    }
}

#[async_trait]
impl LocationProvider for ReplayProvider {
    async fn permission_granted(&self) -> bool {
        true
    }

    async fn current_fix(&self) -> Result<LocationFix, ProviderError> {
        self.fixes
            .first()
            .copied()
            .ok_or_else(|| ProviderError::new("replay trace is empty"))
    }

    async fn subscribe(&self, profile: SubscriptionProfile) -> Result<FixStream, ProviderError> {
        let (tx, stream) = FixStream::channel(64);
        let fixes = self.fixes.clone();
        let tick = self.tick;

        tokio::spawn(async move {
            let mut elapsed = Duration::ZERO;
            let mut last_emit: Option<(GeoPoint, Duration)> = None;

            for fix in fixes {
                tokio::time::sleep(tick).await;
                elapsed += tick;

                let due = match last_emit {
                    None => true,
                    Some((point, at)) => {
                        geo::haversine_distance_m(point, fix.point) >= profile.distance_m
                            || elapsed.saturating_sub(at) >= profile.interval
                    }
                };
                if !due {
                    debug!(lat = %fix.point.latitude, lon = %fix.point.longitude, "replay_fix_filtered");
                    continue;
                }

                last_emit = Some((fix.point, elapsed));
                if tx.send(fix).await.is_err() {
                    // receiver dropped, subscription cancelled
                    break;
                }
            }
        });

        Ok(stream)
    }
}
