//! End-to-end test: monitor and tracker sharing one replayed trace
//!
//! Uses the real JSONL store and replay provider; each service holds its own
//! independent subscription, as in the app.

use chrono::Utc;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, NamedTempFile};
use triplog_core::domain::types::{GeoPoint, JourneyId, LocationFix};
use triplog_core::infra::Config;
use triplog_core::io::{JsonlStore, LogNotifier, ReplayProvider};
use triplog_core::services::{GeofenceMonitor, JourneyTracker};

const CENTER: GeoPoint = GeoPoint { latitude: 45.0, longitude: 9.0 };

/// A fix `meters` north of the geofence center
fn fix_at(meters: f64) -> LocationFix {
    LocationFix {
        point: GeoPoint::new(CENTER.latitude + meters / 111_195.0, CENTER.longitude),
        accuracy_m: 5.0,
        timestamp: Utc::now(),
    }
}

/// Config with the monitor rate limiter disabled and storage in `data_dir`
fn test_config(data_dir: &str) -> Config {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "[storage]\ndata_dir = \"{data_dir}\"\n\n[monitor]\nmin_check_interval_ms = 0\n"
    )
    .unwrap();
    file.flush().unwrap();
    Config::from_file(file.path()).unwrap()
}

#[tokio::test]
async fn test_crossing_and_distance_over_one_trace() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().to_str().unwrap().to_string();

    fs::write(
        dir.path().join("geofences.json"),
        r#"[{"id":1,"name":"Piazza","latitude":45.0,"longitude":9.0,"radius_m":100.0}]"#,
    )
    .unwrap();

    let config = test_config(&data_dir);
    let store = Arc::new(JsonlStore::new(config.data_dir()));

    // outside, inside, inside, outside; steps of 150, 15 and 85 m
    let trace = vec![fix_at(200.0), fix_at(50.0), fix_at(65.0), fix_at(150.0)];
    let provider = Arc::new(ReplayProvider::new(trace, Duration::from_millis(10)));

    let monitor = Arc::new(GeofenceMonitor::new(
        &config,
        store.clone(),
        Arc::new(LogNotifier),
        provider.clone(),
    ));
    let tracker = Arc::new(JourneyTracker::new(&config, store.clone(), provider));

    assert!(monitor.start_monitoring().await.unwrap());
    tracker.start_tracking(JourneyId(9)).await.unwrap();

    // let both pumps drain their replays
    tokio::time::sleep(Duration::from_millis(500)).await;

    monitor.stop_monitoring();
    let distance = tracker.stop_tracking().await.unwrap();
    assert!((distance - 250.0).abs() < 1.0, "got {distance}");

    // monitor: seeded outside, one entry, one exit
    let events = fs::read_to_string(dir.path().join("geofence_events.jsonl")).unwrap();
    let lines: Vec<&str> = events.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("entry"));
    assert!(lines[1].contains("exit"));

    // tracker: full raw trace plus one completion row
    let points = fs::read_to_string(dir.path().join("gps_points.jsonl")).unwrap();
    assert_eq!(points.lines().count(), 4);

    let journeys = fs::read_to_string(dir.path().join("journeys.jsonl")).unwrap();
    let row: serde_json::Value = serde_json::from_str(journeys.trim()).unwrap();
    assert_eq!(row["journey_id"], 9);
    assert_eq!(row["status"], "completed");
}

#[tokio::test]
async fn test_monitoring_declines_without_geofences() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().to_str().unwrap().to_string();

    let config = test_config(&data_dir);
    let store = Arc::new(JsonlStore::new(config.data_dir()));
    let provider = Arc::new(ReplayProvider::new(vec![fix_at(0.0)], Duration::from_millis(10)));

    let monitor = GeofenceMonitor::new(&config, store, Arc::new(LogNotifier), provider);

    assert!(!monitor.start_monitoring().await.unwrap());
    assert!(!monitor.is_monitoring());
}
