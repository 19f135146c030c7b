//! Persistence seam and JSONL-backed store
//!
//! Events, GPS points and journey completions are appended in JSONL format
//! (one JSON object per line). The geofence snapshot is read from a
//! `geofences.json` file maintained by the settings surface.

use crate::domain::error::StoreError;
use crate::domain::types::{Geofence, GeofenceEvent, GeofenceId, GpsPoint, JourneyId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persistence operations the engine depends on
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Current geofence snapshot; empty when none are configured
    async fn geofences(&self) -> Result<Vec<Geofence>, StoreError>;

    /// Append one detected transition to the event log
    async fn add_geofence_event(&self, event: &GeofenceEvent) -> Result<(), StoreError>;

    /// Most recent logged event for a geofence, if any
    async fn latest_geofence_event(
        &self,
        geofence_id: GeofenceId,
    ) -> Result<Option<GeofenceEvent>, StoreError>;

    /// Append one raw trace sample
    async fn add_gps_point(&self, point: &GpsPoint) -> Result<(), StoreError>;

    /// Mark a journey completed with its final accumulated distance
    async fn end_journey(&self, journey_id: JourneyId, total_distance_m: f64)
        -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct JourneyRow {
    journey_id: JourneyId,
    total_distance_m: f64,
    status: String,
    ended_at: DateTime<Utc>,
}

/// Append-only JSONL store rooted at a data directory
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        info!(dir = %dir.display(), "store_initialized");
        Self { dir }
    }

    fn geofences_path(&self) -> PathBuf {
        self.dir.join("geofences.json")
    }

    fn events_path(&self) -> PathBuf {
        self.dir.join("geofence_events.jsonl")
    }

    fn points_path(&self) -> PathBuf {
        self.dir.join("gps_points.jsonl")
    }

    fn journeys_path(&self) -> PathBuf {
        self.dir.join("journeys.jsonl")
    }

    /// Append a line, creating parent directories on first write
    fn append_line(&self, path: &Path, line: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        debug!(file = %path.display(), bytes = %line.len(), "store_row_appended");

        Ok(())
    }
}

#[async_trait]
impl TripStore for JsonlStore {
    async fn geofences(&self) -> Result<Vec<Geofence>, StoreError> {
        let path = self.geofences_path();
        if !path.exists() {
            // nothing configured yet
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path)?;
        let fences: Vec<Geofence> = serde_json::from_str(&content)?;
        Ok(fences)
    }

    async fn add_geofence_event(&self, event: &GeofenceEvent) -> Result<(), StoreError> {
        let line = serde_json::to_string(event)?;
        self.append_line(&self.events_path(), &line)?;
        Ok(())
    }

    async fn latest_geofence_event(
        &self,
        geofence_id: GeofenceId,
    ) -> Result<Option<GeofenceEvent>, StoreError> {
        let path = self.events_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let mut latest = None;
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let event: GeofenceEvent = serde_json::from_str(line)?;
            if event.geofence_id == geofence_id {
                latest = Some(event);
            }
        }
        Ok(latest)
    }

    async fn add_gps_point(&self, point: &GpsPoint) -> Result<(), StoreError> {
        let line = serde_json::to_string(point)?;
        self.append_line(&self.points_path(), &line)?;
        Ok(())
    }

    async fn end_journey(
        &self,
        journey_id: JourneyId,
        total_distance_m: f64,
    ) -> Result<(), StoreError> {
        let row = JourneyRow {
            journey_id,
            total_distance_m,
            status: "completed".to_string(),
            ended_at: Utc::now(),
        };
        let line = serde_json::to_string(&row)?;
        self.append_line(&self.journeys_path(), &line)?;

        info!(
            journey_id = %journey_id,
            total_distance_m = %total_distance_m,
            "journey_completed"
        );
        Ok(())
    }
}
