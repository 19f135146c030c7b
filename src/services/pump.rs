//! Fix-stream pump shared by the tracker and the monitor
//!
//! One pump per active subscription; all state mutation stays inside the
//! handler, so each component keeps single-writer discipline.

use crate::domain::types::LocationFix;
use crate::io::location::FixStream;
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub(crate) struct FixPump {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FixPump {
    /// Drain a fix stream into the handler until stopped or the stream ends
    pub(crate) fn spawn<H, Fut>(mut stream: FixStream, on_fix: H) -> Self
    where
        H: Fn(LocationFix) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    fix = stream.next() => match fix {
                        Some(fix) => on_fix(fix).await,
                        None => break,
                    },
                }
            }
        });

        Self { stop: stop_tx, task }
    }

    /// Stop draining; fixes delivered after this call are discarded, not queued
    pub(crate) fn shutdown(self) {
        let _ = self.stop.send(true);
        self.task.abort();
    }
}
