//! Owns the background loop tasks.
//!
//! Each loop is an explicit task with its own interval; there is no shared
//! cron surface. The scheduler hands every task the same shutdown signal
//! and joins them on the way out.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use super::{ReconciliationLoop, SessionCompletionLoop};

pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawns the reconciliation and session-completion loops.
    pub fn start(
        reconciliation: Arc<ReconciliationLoop>,
        session_completion: Arc<SessionCompletionLoop>,
    ) -> Self {
        let (shutdown, rx) = watch::channel(false);

        let reconciliation_rx = rx.clone();
        let reconciliation_handle = tokio::spawn(async move {
            reconciliation.run(reconciliation_rx).await;
        });
        let completion_handle = tokio::spawn(async move {
            session_completion.run(rx).await;
        });

        info!("Scheduler started");
        Self {
            shutdown,
            handles: vec![reconciliation_handle, completion_handle],
        }
    }

    /// Signals shutdown and waits for every loop to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("Scheduler stopped");
    }
}
