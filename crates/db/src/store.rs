//! Postgres-backed implementation of the game state machine's store seam.

use async_trait::async_trait;
use sqlx::PgPool;
use trove_core::game::{Actor, ClaimedCode, GameStore, StoreError, Target, TeamStatus};
use trove_core::team::TeamRole;
use trove_core::types::{Cents, DbId};

use crate::models::location::Location;
use crate::repositories::{CodeRepo, CompletionRepo, LocationRepo, PlayerRepo, TeamRepo};

/// Map database failures onto the store error taxonomy.
///
/// Connection-level failures are `Unavailable` so the state machine can
/// apply its fallback policy; anything else is `Internal`.
fn map_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
        sqlx::Error::PoolTimedOut => StoreError::Unavailable("connection pool timed out".into()),
        sqlx::Error::PoolClosed => StoreError::Unavailable("connection pool closed".into()),
        other => StoreError::Internal(other.to_string()),
    }
}

fn target_from(location: Location) -> Target {
    Target {
        location_id: location.id,
        point: location.point(),
        name: location.name,
        winning_amount_cents: location.winning_amount_cents,
        minimum_team_size: location.minimum_team_size,
    }
}

/// `GameStore` backed by the Postgres repositories.
#[derive(Clone)]
pub struct PgGameStore {
    pool: PgPool,
}

impl PgGameStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn location(&self, id: DbId) -> Result<Option<Target>, StoreError> {
        let location = LocationRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_err)?;
        Ok(location.map(target_from))
    }

    async fn has_completed(&self, actor: Actor, location_id: DbId) -> Result<bool, StoreError> {
        CompletionRepo::has_completed(&self.pool, actor, location_id)
            .await
            .map_err(map_err)
    }

    async fn issue_code(
        &self,
        location_id: DbId,
        next_location_id: Option<DbId>,
    ) -> Result<String, StoreError> {
        // No explicit next hop: chain to the nearest other active location,
        // if the hunt has one. A single-location hunt terminates here.
        let next = match next_location_id {
            Some(id) => Some(id),
            None => {
                let current = LocationRepo::find_by_id(&self.pool, location_id)
                    .await
                    .map_err(map_err)?
                    .ok_or_else(|| {
                        StoreError::Internal(format!("location {location_id} not found"))
                    })?;
                LocationRepo::find_nearest(&self.pool, current.point(), &[location_id])
                    .await
                    .map_err(map_err)?
                    .map(|l| l.id)
            }
        };

        let code = CodeRepo::issue(&self.pool, location_id, next)
            .await
            .map_err(map_err)?;
        Ok(code.code)
    }

    async fn claim_code(
        &self,
        code: &str,
        location_id: DbId,
    ) -> Result<Option<ClaimedCode>, StoreError> {
        let claimed = CodeRepo::claim(&self.pool, code, location_id)
            .await
            .map_err(map_err)?;
        Ok(claimed.map(|c| ClaimedCode {
            code_id: c.id,
            next_location_id: c.next_location_id,
        }))
    }

    async fn record_completion(
        &self,
        actor: Actor,
        location_id: DbId,
        code_id: Option<DbId>,
        winning_amount_cents: Cents,
    ) -> Result<bool, StoreError> {
        CompletionRepo::record(&self.pool, actor, location_id, code_id, winning_amount_cents)
            .await
            .map_err(map_err)
    }

    async fn team_status(&self, team_id: DbId) -> Result<TeamStatus, StoreError> {
        let team = TeamRepo::find_by_id(&self.pool, team_id)
            .await
            .map_err(map_err)?
            .ok_or_else(|| StoreError::Internal(format!("team {team_id} not found")))?;

        let members = TeamRepo::members(&self.pool, team_id)
            .await
            .map_err(map_err)?;

        let leader_id = members
            .iter()
            .find(|m| m.role == TeamRole::Leader.as_str())
            .map(|m| m.player_id)
            .unwrap_or(team.created_by);

        Ok(TeamStatus {
            leader_id,
            member_ids: members.into_iter().map(|m| m.player_id).collect(),
            current_location_id: team.current_location_id,
        })
    }

    async fn credit_player(&self, player_id: DbId, amount_cents: Cents) -> Result<(), StoreError> {
        PlayerRepo::add_winnings(&self.pool, player_id, amount_cents)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn advance_team(
        &self,
        team_id: DbId,
        next_location_id: Option<DbId>,
    ) -> Result<(), StoreError> {
        TeamRepo::advance(&self.pool, team_id, next_location_id)
            .await
            .map_err(map_err)?;
        Ok(())
    }
}
