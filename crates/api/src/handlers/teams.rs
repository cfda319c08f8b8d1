//! Handlers for the `/teams` resource: creation, invites, and joining.
//!
//! Join validation is pure logic in `trove_core::team`; these handlers
//! load the rows it needs, run it, and apply the result. Invite
//! consumption is a conditional UPDATE so a shared invite link can only
//! ever admit one player.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use trove_core::codes;
use trove_core::error::CoreError;
use trove_core::team::{self, InviteCheck, JoinError};
use trove_core::types::{DbId, Timestamp};
use trove_db::models::team::{TeamMember, TeamWithSize};
use trove_db::repositories::{LocationRepo, TeamRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequirePlayer;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /teams/invites`.
#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    pub team_id: DbId,
}

/// Response body for `POST /teams/invites`.
#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub code: String,
    pub team_id: DbId,
    pub location_id: DbId,
    pub expires_at: Timestamp,
}

/// Request body for `POST /teams/join`.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub code: String,
}

/// Full team view: row, members, and whether quorum currently holds.
#[derive(Debug, Serialize)]
pub struct TeamView {
    pub team: TeamWithSize,
    pub members: Vec<TeamMember>,
    /// `None` when the team has no current location to measure against.
    pub quorum_met: Option<bool>,
}

async fn team_view(state: &AppState, team_id: DbId) -> AppResult<TeamView> {
    let team = TeamRepo::find_with_size(&state.pool, team_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "team",
            id: team_id,
        }))?;
    let members = TeamRepo::members(&state.pool, team_id).await?;

    let quorum_met = match team.current_location_id {
        Some(location_id) => LocationRepo::find_by_id(&state.pool, location_id)
            .await?
            .map(|l| team::quorum_met(members.len(), l.minimum_team_size)),
        None => None,
    };

    Ok(TeamView {
        team,
        members,
        quorum_met,
    })
}

/// The location the calling player is currently playing: their session
/// target if a session exists, otherwise the active location.
async fn player_location_id(state: &AppState, player_id: DbId) -> AppResult<DbId> {
    if let Some(session) = state.sessions.get(player_id).await {
        let session = session.lock().await;
        return Ok(session.target().location_id);
    }
    let location = LocationRepo::find_active(&state.pool)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "active location",
            id: 0,
        }))?;
    Ok(location.id)
}

/// Point the player's live session (if any) at their team.
async fn attach_session_to_team(state: &AppState, player_id: DbId, team_id: DbId) {
    if let Some(session) = state.sessions.get(player_id).await {
        let mut session = session.lock().await;
        session.attach_team(team_id);
        session.refresh().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/teams
///
/// Create a team for the caller's current location, with the caller as
/// leader. Idempotent: creating again returns the existing team.
pub async fn create(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<DataResponse<TeamView>>)> {
    let location_id = player_location_id(&state, user.user_id).await?;
    let team = TeamRepo::create(&state.pool, user.user_id, location_id).await?;

    attach_session_to_team(&state, user.user_id, team.id).await;

    tracing::info!(
        player_id = user.user_id,
        team_id = team.id,
        location_id,
        "Team created"
    );

    let view = team_view(&state, team.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// GET /api/v1/teams/{id}
pub async fn get(
    RequirePlayer(_user): RequirePlayer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TeamView>>> {
    let view = team_view(&state, id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/teams/invites
///
/// Mint a one-use invite to the caller's team. Leader only; the invite is
/// bound to the team's current location and expires after an hour.
pub async fn create_invite(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
    Json(input): Json<CreateInviteRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<InviteResponse>>)> {
    let team = TeamRepo::find_by_id(&state.pool, input.team_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "team",
            id: input.team_id,
        }))?;

    if team.created_by != user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the team leader can create invites".into(),
        )));
    }

    let location_id = team.current_location_id.ok_or_else(|| {
        AppError::Core(CoreError::Conflict(
            "Team has no current location to invite to".into(),
        ))
    })?;

    let expires_at = team::invite_expiry(Utc::now());
    let invite =
        TeamRepo::create_invite(&state.pool, team.id, location_id, user.user_id, expires_at)
            .await?;

    tracing::info!(team_id = team.id, invite_id = invite.id, "Invite created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: InviteResponse {
                code: invite.code,
                team_id: invite.team_id,
                location_id: invite.location_id,
                expires_at: invite.expires_at,
            },
        }),
    ))
}

/// POST /api/v1/teams/join
///
/// Join a team via invite code. The invite must be unused, unexpired, and
/// for the location the caller is currently playing.
pub async fn join(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
    Json(input): Json<JoinRequest>,
) -> AppResult<Json<DataResponse<TeamView>>> {
    let code = codes::normalize(&input.code);
    let invite = TeamRepo::find_invite(&state.pool, &code)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "invite",
            id: 0,
        }))?;

    let team = TeamRepo::find_by_id(&state.pool, invite.team_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "team",
            id: invite.team_id,
        }))?;

    let team_location = team.current_location_id.ok_or_else(|| {
        AppError::Core(CoreError::Conflict(
            "Team has no current location".into(),
        ))
    })?;

    let joiner_location = player_location_id(&state, user.user_id).await?;
    let already_member = TeamRepo::is_member(&state.pool, team.id, user.user_id).await?;

    team::validate_join(
        &InviteCheck {
            team_id: invite.team_id,
            location_id: invite.location_id,
            expires_at: invite.expires_at,
            used: invite.used,
        },
        team_location,
        joiner_location,
        already_member,
        Utc::now(),
    )?;

    // A second racing join with the same invite loses here.
    TeamRepo::consume_invite(&state.pool, &code, user.user_id)
        .await?
        .ok_or(AppError::Join(JoinError::InviteUsed))?;

    TeamRepo::add_member(&state.pool, team.id, user.user_id).await?;
    attach_session_to_team(&state, user.user_id, team.id).await;

    tracing::info!(
        player_id = user.user_id,
        team_id = team.id,
        "Player joined team"
    );

    let view = team_view(&state, team.id).await?;
    Ok(Json(DataResponse { data: view }))
}
