//! Completion (idempotency guard) models.

use serde::Serialize;
use sqlx::FromRow;
use trove_core::types::{Cents, DbId, Timestamp};

/// A row from the `completions` table. Exactly one of `player_id` /
/// `team_id` is set.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Completion {
    pub id: DbId,
    pub player_id: Option<DbId>,
    pub team_id: Option<DbId>,
    pub location_id: DbId,
    pub code_id: Option<DbId>,
    pub winning_amount_cents: Cents,
    pub completed_at: Timestamp,
}
