//! Repository for the `completions` table.
//!
//! Completions are append-once per `(actor, location)`: the insert uses
//! `ON CONFLICT DO NOTHING` against the partial unique indexes, and the
//! game flow never deletes rows.

use sqlx::PgPool;
use trove_core::game::Actor;
use trove_core::types::{Cents, DbId};

use crate::models::completion::Completion;

const COLUMNS: &str =
    "id, player_id, team_id, location_id, code_id, winning_amount_cents, completed_at";

/// Split an actor into the `(player_id, team_id)` column pair.
fn actor_columns(actor: Actor) -> (Option<DbId>, Option<DbId>) {
    match actor {
        Actor::Player(id) => (Some(id), None),
        Actor::Team(id) => (None, Some(id)),
    }
}

/// Provides append-once completion records and completed-set queries.
pub struct CompletionRepo;

impl CompletionRepo {
    /// Record a completion. Returns `false` when the actor had already
    /// completed the location (no row written).
    pub async fn record(
        pool: &PgPool,
        actor: Actor,
        location_id: DbId,
        code_id: Option<DbId>,
        winning_amount_cents: Cents,
    ) -> Result<bool, sqlx::Error> {
        let (player_id, team_id) = actor_columns(actor);
        let result = sqlx::query(
            "INSERT INTO completions (player_id, team_id, location_id, code_id, winning_amount_cents)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT DO NOTHING",
        )
        .bind(player_id)
        .bind(team_id)
        .bind(location_id)
        .bind(code_id)
        .bind(winning_amount_cents)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether the actor has completed the location.
    pub async fn has_completed(
        pool: &PgPool,
        actor: Actor,
        location_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let (player_id, team_id) = actor_columns(actor);
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM completions
                WHERE location_id = $3
                  AND (player_id = $1 OR team_id = $2)
             )",
        )
        .bind(player_id)
        .bind(team_id)
        .bind(location_id)
        .fetch_one(pool)
        .await?;
        Ok(exists.0)
    }

    /// The actor's completed location ids, oldest first.
    pub async fn completed_location_ids(
        pool: &PgPool,
        actor: Actor,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let (player_id, team_id) = actor_columns(actor);
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT location_id FROM completions
             WHERE player_id = $1 OR team_id = $2
             ORDER BY completed_at",
        )
        .bind(player_id)
        .bind(team_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Full completion rows for an actor (admin/debug view).
    pub async fn list_for_actor(
        pool: &PgPool,
        actor: Actor,
    ) -> Result<Vec<Completion>, sqlx::Error> {
        let (player_id, team_id) = actor_columns(actor);
        let query = format!(
            "SELECT {COLUMNS} FROM completions
             WHERE player_id = $1 OR team_id = $2
             ORDER BY completed_at"
        );
        sqlx::query_as::<_, Completion>(&query)
            .bind(player_id)
            .bind(team_id)
            .fetch_all(pool)
            .await
    }
}
