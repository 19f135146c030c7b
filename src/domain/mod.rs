//! Domain models - core value types and geo math
//!
//! This module contains the canonical data types used throughout the engine:
//! - `GeoPoint` / `LocationFix` - reported device positions
//! - `Geofence` - a named circular region monitored for entry/exit
//! - `GeofenceEvent` / `Transition` - detected boundary crossings
//! - `GpsPoint` - a raw trace sample belonging to a journey
//! - `geo` - haversine great-circle distance
//! - `error` - the engine's error taxonomy

pub mod error;
pub mod geo;
pub mod types;
