//! Shared types for the travel-log engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Newtype wrapper for geofence IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct GeofenceId(pub i64);

impl std::fmt::Display for GeofenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for journey IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct JourneyId(pub i64);

impl std::fmt::Display for JourneyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A single reported device position with accuracy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    #[serde(flatten)]
    pub point: GeoPoint,
    pub accuracy_m: f64,
    pub timestamp: DateTime<Utc>,
}

/// A named circular region monitored for entry/exit
///
/// Owned by persistent storage and edited through the settings surface;
/// the monitor only ever sees a loaded snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub id: GeofenceId,
    pub name: String,
    #[serde(flatten)]
    pub center: GeoPoint,
    pub radius_m: f64,
}

/// Direction of a geofence boundary crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Entry,
    Exit,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Entry => "entry",
            Transition::Exit => "exit",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected boundary crossing, appended to the event log
///
/// Events for a given geofence strictly alternate from whatever the first
/// detected transition is. Nothing is enforced across process restarts:
/// in-memory region state is rebuilt from the first fix after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEvent {
    pub geofence_id: GeofenceId,
    pub transition: Transition,
    pub timestamp: DateTime<Utc>,
}

/// A raw GPS trace sample belonging to a journey
///
/// Persisted for every fix received while tracking, including fixes the
/// distance accumulator rejects, so the full trace stays recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub journey_id: JourneyId,
    #[serde(flatten)]
    pub point: GeoPoint,
    pub accuracy_m: f64,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of the journey tracker's state, safe to read at any time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingStatus {
    pub is_tracking: bool,
    pub journey_id: Option<JourneyId>,
    pub total_distance_m: f64,
}
