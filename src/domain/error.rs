//! Error taxonomy for the travel-log engine
//!
//! Permission denial is never an error: it surfaces as a `false` return from
//! `start_monitoring`. The background task bridge is a hard boundary and
//! returns nothing; everything below it is logged, not raised.

use thiserror::Error;

/// A persistence write or read failed
///
/// Swallowed (logged) for non-critical writes like GPS points and per-event
/// dispatch; propagated for critical writes like ending a journey.
#[derive(Debug, Error)]
#[error("persistence failure: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

/// A location fix could not be acquired
///
/// Propagated from the single-shot APIs; on the continuous stream a failed
/// tick is simply skipped by the provider.
#[derive(Debug, Error)]
#[error("location provider failure: {0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A notification could not be dispatched
///
/// Fire-and-forget from the engine's perspective: callers log and move on.
#[derive(Debug, Error)]
#[error("notification dispatch failure: {0}")]
pub struct NotifyError(pub String);

impl NotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Journey tracking failures that reach the caller
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Ending a journey is a user action and must report failure
    #[error("journey could not be finalized: {0}")]
    EndJourney(#[from] StoreError),
    #[error("fix subscription failed: {0}")]
    Subscribe(#[from] ProviderError),
}

/// Geofence monitoring failures that reach the caller
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("geofence snapshot could not be loaded: {0}")]
    Snapshot(#[from] StoreError),
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

/// Background bridge collaborator initialization failed
#[derive(Debug, Error)]
#[error("collaborator init failure: {0}")]
pub struct InitError(pub String);

impl InitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
