//! Reveal-code models.

use serde::Serialize;
use sqlx::FromRow;
use trove_core::types::{DbId, Timestamp};

/// A row from the `codes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Code {
    pub id: DbId,
    pub code: String,
    pub location_id: DbId,
    pub next_location_id: Option<DbId>,
    pub used: bool,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
