//! triplog-core - travel-log engine harness
//!
//! Replays a recorded fix trace through the engine: the geofence monitor
//! watches the configured regions while an optional journey records distance.
//!
//! Module structure:
//! - `domain/` - Core value types (GeoPoint, Geofence, events) and geo math
//! - `io/` - External collaborators (store, notifier, location provider)
//! - `services/` - Business logic (JourneyTracker, GeofenceMonitor, bridge)
//! - `infra/` - Infrastructure (Config)

use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use triplog_core::domain::types::JourneyId;
use triplog_core::infra::Config;
use triplog_core::io::{JsonlStore, LogNotifier, ReplayProvider};
use triplog_core::services::{GeofenceMonitor, JourneyTracker};

/// triplog-core - geofence monitoring and journey recording over a fix trace
#[derive(Parser, Debug)]
#[command(name = "triplog-core", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Record the replayed trace against this journey id
    #[arg(short, long)]
    journey: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for per-fix visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("triplog-core starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        data_dir = %config.data_dir(),
        replay_file = %config.replay_file(),
        min_step_m = %config.min_step_m(),
        max_step_m = %config.max_step_m(),
        min_check_interval_ms = %config.min_check_interval().as_millis(),
        "config_loaded"
    );

    let store = Arc::new(JsonlStore::new(config.data_dir()));
    let notifier = Arc::new(LogNotifier);
    let provider = Arc::new(ReplayProvider::from_file(config.replay_file(), config.replay_tick())?);

    let monitor = Arc::new(GeofenceMonitor::new(
        &config,
        store.clone(),
        notifier,
        provider.clone(),
    ));
    let tracker = Arc::new(JourneyTracker::new(&config, store, provider));

    if monitor.start_monitoring().await? {
        info!("monitoring_active");
    } else {
        info!("monitoring_inactive");
    }

    if let Some(id) = args.journey {
        tracker.start_tracking(JourneyId(id)).await?;
    }

    // Run until interrupted, then flush both services
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown_signal_received");

    monitor.stop_monitoring();
    let distance = tracker.stop_tracking().await?;
    info!(total_distance_m = %distance, "triplog-core shutdown complete");
    Ok(())
}
