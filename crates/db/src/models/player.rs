//! Player models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trove_core::types::{Cents, DbId, Timestamp};

/// A row from the `players` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Player {
    pub id: DbId,
    pub display_name: String,
    pub device_fingerprint: String,
    pub total_winnings_cents: Cents,
    pub last_seen_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for registering (or re-registering) a player. The fingerprint here
/// is the server-side hash, not the raw client string.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertPlayer {
    pub display_name: String,
    pub device_fingerprint: String,
}
