//! Repository for the `codes` table.
//!
//! The claim path is the concurrency-sensitive one: a code flips
//! `used: false -> true` via a single conditional UPDATE, so two racing
//! verifications can never both consume the same row.

use sqlx::PgPool;
use trove_core::codes;
use trove_core::types::DbId;

use crate::models::code::Code;

const COLUMNS: &str = "id, code, location_id, next_location_id, used, used_at, created_at";

/// Provides issue/claim operations for reveal codes.
pub struct CodeRepo;

impl CodeRepo {
    /// Insert a freshly generated, unused code for a location.
    pub async fn issue(
        pool: &PgPool,
        location_id: DbId,
        next_location_id: Option<DbId>,
    ) -> Result<Code, sqlx::Error> {
        let value = codes::generate_location_code();
        let query = format!(
            "INSERT INTO codes (code, location_id, next_location_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Code>(&query)
            .bind(&value)
            .bind(location_id)
            .bind(next_location_id)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim a matching unused code.
    ///
    /// Returns the claimed row, or `None` when no unused code with that
    /// value exists for the location (wrong code, or already consumed).
    pub async fn claim(
        pool: &PgPool,
        code: &str,
        location_id: DbId,
    ) -> Result<Option<Code>, sqlx::Error> {
        let query = format!(
            "UPDATE codes SET used = true, used_at = now()
             WHERE code = $1 AND location_id = $2 AND used = false
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Code>(&query)
            .bind(code)
            .bind(location_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a code row by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Code>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM codes WHERE id = $1");
        sqlx::query_as::<_, Code>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List codes for a location, newest first (admin/debug view).
    pub async fn list_for_location(
        pool: &PgPool,
        location_id: DbId,
    ) -> Result<Vec<Code>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM codes WHERE location_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Code>(&query)
            .bind(location_id)
            .fetch_all(pool)
            .await
    }
}
