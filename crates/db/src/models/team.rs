//! Team, membership, and invite models.

use serde::Serialize;
use sqlx::FromRow;
use trove_core::types::{DbId, Timestamp};

/// A row from the `teams` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Team {
    pub id: DbId,
    pub code: String,
    pub created_by: DbId,
    pub current_location_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// A row from the `team_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeamMember {
    pub id: DbId,
    pub team_id: DbId,
    pub player_id: DbId,
    pub role: String,
    pub joined_at: Timestamp,
}

/// A row from the `team_invites` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeamInvite {
    pub id: DbId,
    pub code: String,
    pub team_id: DbId,
    pub location_id: DbId,
    pub created_by: DbId,
    pub expires_at: Timestamp,
    pub used: bool,
    pub used_by: Option<DbId>,
    pub created_at: Timestamp,
}

/// A team joined with its member count, for quorum displays.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeamWithSize {
    pub id: DbId,
    pub code: String,
    pub created_by: DbId,
    pub current_location_id: Option<DbId>,
    pub created_at: Timestamp,
    pub member_count: i64,
}
