//! Notification dispatch seam
//!
//! Delivery mechanics (push tokens, channels, localized copy) live outside
//! the engine; this is the boundary the monitor and the background bridge
//! call through.

use crate::domain::error::NotifyError;
use crate::domain::types::Transition;
use async_trait::async_trait;
use tracing::info;

/// Dispatches a user-facing notification for a geofence transition
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_geofence(
        &self,
        geofence_name: &str,
        transition: Transition,
    ) -> Result<(), NotifyError>;
}

/// Emits notifications as structured log events
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_geofence(
        &self,
        geofence_name: &str,
        transition: Transition,
    ) -> Result<(), NotifyError> {
        info!(
            geofence = %geofence_name,
            transition = %transition,
            "geofence_notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notifier = LogNotifier;
        assert!(notifier.notify_geofence("Casa", Transition::Entry).await.is_ok());
        assert!(notifier.notify_geofence("Casa", Transition::Exit).await.is_ok());
    }
}
