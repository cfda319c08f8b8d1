//! Repository for the `players` table.
//!
//! Players are keyed by a hashed device fingerprint, so registration is an
//! upsert: a returning device gets its existing row back with a refreshed
//! display name and `last_seen_at`.

use sqlx::PgPool;
use trove_core::types::{Cents, DbId};

use crate::models::player::{Player, UpsertPlayer};

const COLUMNS: &str =
    "id, display_name, device_fingerprint, total_winnings_cents, last_seen_at, created_at";

/// Window within which a player counts as online.
const PRESENCE_WINDOW_SECS: i64 = 120;

/// Provides registration, presence, and winnings operations for players.
pub struct PlayerRepo;

impl PlayerRepo {
    /// Register a player, or refresh the existing row for this device.
    pub async fn upsert(pool: &PgPool, input: &UpsertPlayer) -> Result<Player, sqlx::Error> {
        let query = format!(
            "INSERT INTO players (display_name, device_fingerprint)
             VALUES ($1, $2)
             ON CONFLICT (device_fingerprint) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                last_seen_at = now()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Player>(&query)
            .bind(&input.display_name)
            .bind(&input.device_fingerprint)
            .fetch_one(pool)
            .await
    }

    /// Find a player by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Player>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM players WHERE id = $1");
        sqlx::query_as::<_, Player>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a player by hashed device fingerprint.
    pub async fn find_by_fingerprint(
        pool: &PgPool,
        fingerprint: &str,
    ) -> Result<Option<Player>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM players WHERE device_fingerprint = $1");
        sqlx::query_as::<_, Player>(&query)
            .bind(fingerprint)
            .fetch_optional(pool)
            .await
    }

    /// Bump `last_seen_at` for presence tracking.
    pub async fn touch(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE players SET last_seen_at = now() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Number of players seen within the presence window.
    pub async fn online_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM players
             WHERE last_seen_at > now() - make_interval(secs => $1)",
        )
        .bind(PRESENCE_WINDOW_SECS as f64)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Credit winnings to a player's running total.
    pub async fn add_winnings(
        pool: &PgPool,
        id: DbId,
        amount_cents: Cents,
    ) -> Result<Option<Player>, sqlx::Error> {
        let query = format!(
            "UPDATE players SET total_winnings_cents = total_winnings_cents + $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Player>(&query)
            .bind(id)
            .bind(amount_cents)
            .fetch_optional(pool)
            .await
    }
}
