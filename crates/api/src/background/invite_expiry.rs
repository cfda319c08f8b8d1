//! Periodic purge of expired team invites.
//!
//! Expiry is enforced at join time regardless; this task just keeps the
//! `team_invites` table from accumulating dead rows. Runs on a fixed
//! interval using `tokio::time::interval`.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use trove_db::repositories::TeamRepo;

/// How often the purge runs.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the invite purge loop until `cancel` is triggered.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = PURGE_INTERVAL.as_secs(),
        "Invite expiry job started"
    );

    let mut interval = tokio::time::interval(PURGE_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Invite expiry job stopping");
                break;
            }
            _ = interval.tick() => {
                match TeamRepo::purge_expired_invites(&pool, Utc::now()).await {
                    Ok(purged) => {
                        if purged > 0 {
                            tracing::info!(purged, "Invite expiry: purged expired invites");
                        } else {
                            tracing::debug!("Invite expiry: nothing to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Invite expiry: purge failed");
                    }
                }
            }
        }
    }
}
