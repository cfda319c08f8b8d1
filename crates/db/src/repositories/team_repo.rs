//! Repository for teams, memberships, and invites.
//!
//! Team creation is idempotent per `(creator, location)`: creating again
//! returns the existing team instead of minting a second one. Invite
//! claiming mirrors the code claim pattern, a conditional UPDATE that
//! consumes the row at most once.

use sqlx::PgPool;
use tracing::warn;
use trove_core::codes;
use trove_core::team::{self, TeamRole};
use trove_core::types::{DbId, Timestamp};

use crate::models::team::{Team, TeamInvite, TeamMember, TeamWithSize};

const TEAM_COLUMNS: &str = "id, code, created_by, current_location_id, created_at";
const MEMBER_COLUMNS: &str = "id, team_id, player_id, role, joined_at";
const INVITE_COLUMNS: &str =
    "id, code, team_id, location_id, created_by, expires_at, used, used_by, created_at";

/// Provides team lifecycle, membership, and invite operations.
pub struct TeamRepo;

impl TeamRepo {
    /// Create a team led by `creator_id` at `location_id`, or return the
    /// team the creator already leads for that location.
    ///
    /// Retries on team-code collision, which is vanishingly rare with an
    /// 8-character alphanumeric code but cheap to handle.
    pub async fn create(
        pool: &PgPool,
        creator_id: DbId,
        location_id: DbId,
    ) -> Result<Team, sqlx::Error> {
        if let Some(existing) = Self::find_led_by(pool, creator_id, location_id).await? {
            return Ok(existing);
        }

        for attempt in 0..team::MAX_TEAM_CODE_ATTEMPTS {
            let code = codes::generate_team_code();
            let mut tx = pool.begin().await?;

            let query = format!(
                "INSERT INTO teams (code, created_by, current_location_id)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (code) DO NOTHING
                 RETURNING {TEAM_COLUMNS}"
            );
            let inserted = sqlx::query_as::<_, Team>(&query)
                .bind(&code)
                .bind(creator_id)
                .bind(location_id)
                .fetch_optional(&mut *tx)
                .await?;

            let Some(team) = inserted else {
                tx.rollback().await?;
                warn!(attempt, "team code collision, regenerating");
                continue;
            };

            sqlx::query(
                "INSERT INTO team_members (team_id, player_id, role) VALUES ($1, $2, $3)",
            )
            .bind(team.id)
            .bind(creator_id)
            .bind(TeamRole::Leader.as_str())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            return Ok(team);
        }

        Err(sqlx::Error::Protocol(
            "exhausted team code generation attempts".into(),
        ))
    }

    /// Find a team by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Team>, sqlx::Error> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1");
        sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a team by its share code.
    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Team>, sqlx::Error> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE code = $1");
        sqlx::query_as::<_, Team>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// The team `creator_id` leads at `location_id`, if one exists.
    pub async fn find_led_by(
        pool: &PgPool,
        creator_id: DbId,
        location_id: DbId,
    ) -> Result<Option<Team>, sqlx::Error> {
        let query = format!(
            "SELECT {TEAM_COLUMNS} FROM teams
             WHERE created_by = $1 AND current_location_id = $2"
        );
        sqlx::query_as::<_, Team>(&query)
            .bind(creator_id)
            .bind(location_id)
            .fetch_optional(pool)
            .await
    }

    /// The team a player currently belongs to at `location_id`, if any.
    pub async fn find_for_player(
        pool: &PgPool,
        player_id: DbId,
        location_id: DbId,
    ) -> Result<Option<Team>, sqlx::Error> {
        let query = format!(
            "SELECT t.{} FROM teams t
             JOIN team_members m ON m.team_id = t.id
             WHERE m.player_id = $1 AND t.current_location_id = $2",
            TEAM_COLUMNS.replace(", ", ", t."),
        );
        sqlx::query_as::<_, Team>(&query)
            .bind(player_id)
            .bind(location_id)
            .fetch_optional(pool)
            .await
    }

    /// A team together with its member count.
    pub async fn find_with_size(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TeamWithSize>, sqlx::Error> {
        let query = format!(
            "SELECT {TEAM_COLUMNS},
                    (SELECT COUNT(*) FROM team_members m WHERE m.team_id = teams.id) AS member_count
             FROM teams WHERE id = $1"
        );
        sqlx::query_as::<_, TeamWithSize>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Members of a team, leader first, then join order.
    pub async fn members(pool: &PgPool, team_id: DbId) -> Result<Vec<TeamMember>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members
             WHERE team_id = $1
             ORDER BY (role = 'leader') DESC, joined_at"
        );
        sqlx::query_as::<_, TeamMember>(&query)
            .bind(team_id)
            .fetch_all(pool)
            .await
    }

    /// Whether `player_id` belongs to `team_id`.
    pub async fn is_member(
        pool: &PgPool,
        team_id: DbId,
        player_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM team_members WHERE team_id = $1 AND player_id = $2
             )",
        )
        .bind(team_id)
        .bind(player_id)
        .fetch_one(pool)
        .await?;
        Ok(exists.0)
    }

    /// Add a player to a team as a regular member.
    pub async fn add_member(
        pool: &PgPool,
        team_id: DbId,
        player_id: DbId,
    ) -> Result<TeamMember, sqlx::Error> {
        let query = format!(
            "INSERT INTO team_members (team_id, player_id, role)
             VALUES ($1, $2, $3)
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, TeamMember>(&query)
            .bind(team_id)
            .bind(player_id)
            .bind(TeamRole::Member.as_str())
            .fetch_one(pool)
            .await
    }

    /// Move a team to its next location.
    pub async fn advance(
        pool: &PgPool,
        team_id: DbId,
        next_location_id: Option<DbId>,
    ) -> Result<Option<Team>, sqlx::Error> {
        let query = format!(
            "UPDATE teams SET current_location_id = $2
             WHERE id = $1
             RETURNING {TEAM_COLUMNS}"
        );
        sqlx::query_as::<_, Team>(&query)
            .bind(team_id)
            .bind(next_location_id)
            .fetch_optional(pool)
            .await
    }

    // ---- invites ----

    /// Create an invite to `team_id` for the team's current location.
    pub async fn create_invite(
        pool: &PgPool,
        team_id: DbId,
        location_id: DbId,
        created_by: DbId,
        expires_at: Timestamp,
    ) -> Result<TeamInvite, sqlx::Error> {
        let code = codes::generate_invite_code();
        let query = format!(
            "INSERT INTO team_invites (code, team_id, location_id, created_by, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {INVITE_COLUMNS}"
        );
        sqlx::query_as::<_, TeamInvite>(&query)
            .bind(&code)
            .bind(team_id)
            .bind(location_id)
            .bind(created_by)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find an invite by its code.
    pub async fn find_invite(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<TeamInvite>, sqlx::Error> {
        let query = format!("SELECT {INVITE_COLUMNS} FROM team_invites WHERE code = $1");
        sqlx::query_as::<_, TeamInvite>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Consume an invite for `player_id`. Returns `None` when the invite
    /// was already used (or does not exist).
    pub async fn consume_invite(
        pool: &PgPool,
        code: &str,
        player_id: DbId,
    ) -> Result<Option<TeamInvite>, sqlx::Error> {
        let query = format!(
            "UPDATE team_invites SET used = true, used_by = $2
             WHERE code = $1 AND used = false
             RETURNING {INVITE_COLUMNS}"
        );
        sqlx::query_as::<_, TeamInvite>(&query)
            .bind(code)
            .bind(player_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete invites that expired before `cutoff`. Returns rows removed.
    pub async fn purge_expired_invites(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_invites WHERE expires_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
