//! Periodic eviction of abandoned game sessions.
//!
//! Completed sessions are dropped at verification time; this task reclaims
//! the ones whose clients simply stopped calling, so the in-memory registry
//! does not grow without bound.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::session::SessionManager;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(600); // 10 minutes

/// Sessions untouched for this long are evicted.
const MAX_IDLE: Duration = Duration::from_secs(7200); // 2 hours

/// Run the session sweep loop until `cancel` is triggered.
pub async fn run(sessions: Arc<SessionManager>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        max_idle_secs = MAX_IDLE.as_secs(),
        "Session sweep job started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweep job stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = sessions.sweep_idle(MAX_IDLE).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Session sweep: evicted idle sessions");
                } else {
                    tracing::debug!("Session sweep: nothing to evict");
                }
            }
        }
    }
}
