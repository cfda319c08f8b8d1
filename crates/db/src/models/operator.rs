//! Operator (admin account) models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trove_core::types::{DbId, Timestamp};

/// A row from the `operators` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Operator {
    pub id: DbId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an operator (password already hashed).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOperator {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}
