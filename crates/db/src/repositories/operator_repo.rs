//! Repository for the `operators` table.

use sqlx::PgPool;
use trove_core::types::DbId;

use crate::models::operator::{CreateOperator, Operator};

const COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

/// Provides CRUD operations for operator accounts.
pub struct OperatorRepo;

impl OperatorRepo {
    /// Insert a new operator. The password must already be hashed.
    pub async fn create(pool: &PgPool, input: &CreateOperator) -> Result<Operator, sqlx::Error> {
        let query = format!(
            "INSERT INTO operators (username, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Operator>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Find an operator by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Operator>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM operators WHERE id = $1");
        sqlx::query_as::<_, Operator>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an operator by username (login path).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Operator>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM operators WHERE username = $1");
        sqlx::query_as::<_, Operator>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Number of operator accounts. Used to allow first-run bootstrap.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM operators")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
