//! Handlers for the `/game` resource: the per-player pursuit session.
//!
//! The session itself lives in [`crate::session::SessionManager`]; these
//! handlers translate HTTP requests into state machine calls and its
//! reports back into JSON.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use trove_core::error::CoreError;
use trove_core::game::{Actor, GameSession, Phase, PositionReport, Target, VerifyOutcome};
use trove_core::geo::{self, GeoPoint};
use trove_core::smoothing::{GpsSample, DEFAULT_ACCURACY_M};
use trove_core::types::{Cents, DbId, Timestamp};
use trove_db::models::location::Location;
use trove_db::repositories::{LocationRepo, PlayerRepo, TeamRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePlayer;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Optional request body for `POST /game/session`.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Client-cached copy of a previously fetched location, used only when
    /// no active location can be read at start time.
    pub fallback_target: Option<FallbackTarget>,
}

/// A client-cached location row offered as a pursuit target.
#[derive(Debug, Deserialize)]
pub struct FallbackTarget {
    pub location_id: DbId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub winning_amount_cents: Cents,
    pub minimum_team_size: Option<i32>,
}

/// Request body for `POST /game/position`.
#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported GPS accuracy radius in meters. Missing accuracy is treated
    /// as poor rather than perfect.
    pub accuracy_m: Option<f64>,
    /// Client capture time; defaults to the server clock.
    pub captured_at: Option<Timestamp>,
}

/// Request body for `POST /game/heading`.
#[derive(Debug, Deserialize)]
pub struct HeadingRequest {
    /// Raw compass heading in degrees.
    pub heading: f64,
}

/// Response body for `POST /game/heading`.
#[derive(Debug, Serialize)]
pub struct HeadingResponse {
    /// Exponentially smoothed heading in `[0, 360)`.
    pub heading: f64,
}

/// Request body for `POST /game/scratch`.
#[derive(Debug, Deserialize)]
pub struct ScratchRequest {
    /// Fraction of the scratch overlay cleared, in `[0, 1]`.
    pub fraction: f64,
}

/// Request body for `POST /game/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

/// Response body for `POST /game/reveal`.
#[derive(Debug, Serialize)]
pub struct RevealResponse {
    pub code: String,
    pub phase: Phase,
}

/// Response body for phase-only transitions (scratch, AR open).
#[derive(Debug, Serialize)]
pub struct PhaseResponse {
    pub phase: Phase,
}

/// Target fields exposed to clients. The target's coordinates are
/// deliberately absent until the code is verified; the compass only ever
/// needs distance and bearing, which come from position reports.
#[derive(Debug, Serialize)]
pub struct TargetInfo {
    pub location_id: DbId,
    pub name: String,
    pub winning_amount_cents: Cents,
    pub minimum_team_size: i32,
}

/// Snapshot of the caller's session.
#[derive(Debug, Serialize)]
pub struct SessionState {
    pub phase: Phase,
    pub actor: Actor,
    pub target: TargetInfo,
    pub distance_m: Option<f64>,
    pub distance_display: Option<String>,
    /// Present once a reveal code has been issued for this target.
    pub code: Option<String>,
}

fn target_info(target: &Target) -> TargetInfo {
    TargetInfo {
        location_id: target.location_id,
        name: target.name.clone(),
        winning_amount_cents: target.winning_amount_cents,
        minimum_team_size: target.minimum_team_size,
    }
}

fn target_from(location: &Location) -> Target {
    Target {
        location_id: location.id,
        name: location.name.clone(),
        point: location.point(),
        winning_amount_cents: location.winning_amount_cents,
        minimum_team_size: location.minimum_team_size,
    }
}

fn session_state(session: &GameSession) -> SessionState {
    let distance_m = session.last_distance_m();
    SessionState {
        phase: session.phase(),
        actor: session.actor(),
        target: target_info(session.target()),
        distance_m,
        distance_display: distance_m.map(geo::format_distance),
        code: session.issued_code().map(str::to_owned),
    }
}

/// Look up the caller's live session or reject with 404.
async fn require_session(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<Arc<Mutex<GameSession>>> {
    state
        .sessions
        .get(user.user_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "game session",
            id: user.user_id,
        }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/game/session
///
/// Start (or restart) a pursuit of the currently active location. If the
/// player already belongs to a team for that location, the session acts as
/// the team. When no active location exists, a client-cached fallback
/// target from the optional request body is accepted instead; with
/// neither, the start is a 404.
pub async fn start_session(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
    body: Option<Json<StartSessionRequest>>,
) -> AppResult<Json<DataResponse<SessionState>>> {
    let target = match LocationRepo::find_active(&state.pool).await? {
        Some(location) => target_from(&location),
        None => {
            let fallback = body
                .and_then(|Json(b)| b.fallback_target)
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "active location",
                    id: 0,
                }))?;
            let point = GeoPoint::new(fallback.latitude, fallback.longitude);
            if !point.is_valid() {
                return Err(AppError::Core(CoreError::Validation(
                    "Latitude must be in [-90, 90] and longitude in [-180, 180]".into(),
                )));
            }
            tracing::warn!(
                player_id = user.user_id,
                location_id = fallback.location_id,
                "No active location; starting from client-cached fallback target"
            );
            Target {
                location_id: fallback.location_id,
                name: fallback.name,
                point,
                winning_amount_cents: fallback.winning_amount_cents,
                minimum_team_size: fallback.minimum_team_size.unwrap_or(1).max(1),
            }
        }
    };

    let location_id = target.location_id;
    let actor = match TeamRepo::find_for_player(&state.pool, user.user_id, location_id).await? {
        Some(team) => Actor::Team(team.id),
        None => Actor::Player(user.user_id),
    };

    let session = GameSession::new(
        Arc::clone(&state.store) as Arc<dyn trove_core::game::GameStore>,
        actor,
        target,
        state.config.fallback,
    );

    tracing::info!(
        player_id = user.user_id,
        location_id,
        ?actor,
        "Game session started"
    );

    let session = state.sessions.insert(user.user_id, session).await;
    let session = session.lock().await;
    Ok(Json(DataResponse {
        data: session_state(&session),
    }))
}

/// GET /api/v1/game/session
///
/// Current session snapshot. Re-evaluates team quorum so a waiting leader
/// sees the reveal as soon as the last member joins.
pub async fn get_session(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<SessionState>>> {
    let session = require_session(&state, &user).await?;
    let mut session = session.lock().await;
    session.refresh().await;
    Ok(Json(DataResponse {
        data: session_state(&session),
    }))
}

/// DELETE /api/v1/game/session
///
/// Abandon the current pursuit.
pub async fn end_session(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<()>>> {
    state.sessions.remove(user.user_id).await;
    tracing::info!(player_id = user.user_id, "Game session ended");
    Ok(Json(DataResponse { data: () }))
}

/// POST /api/v1/game/position
///
/// Feed one GPS fix through the smoothing window and the geofence logic.
pub async fn update_position(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
    Json(input): Json<PositionRequest>,
) -> AppResult<Json<DataResponse<PositionReport>>> {
    let point = GeoPoint::new(input.latitude, input.longitude);
    if !point.is_valid() {
        return Err(AppError::Core(CoreError::Validation(
            "Latitude must be in [-90, 90] and longitude in [-180, 180]".into(),
        )));
    }

    let sample = GpsSample {
        point,
        accuracy_m: input.accuracy_m.unwrap_or(DEFAULT_ACCURACY_M),
        captured_at: input.captured_at.unwrap_or_else(Utc::now),
    };

    let session = require_session(&state, &user).await?;
    let mut session = session.lock().await;
    let report = session.update_position(sample).await?;

    // Position updates double as presence; a failed touch is not worth
    // failing the fix over.
    if let Err(e) = PlayerRepo::touch(&state.pool, user.user_id).await {
        tracing::warn!(error = %e, player_id = user.user_id, "Presence touch failed");
    }

    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/game/heading
///
/// Feed one compass reading through the heading smoother.
pub async fn update_heading(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
    Json(input): Json<HeadingRequest>,
) -> AppResult<Json<DataResponse<HeadingResponse>>> {
    if !input.heading.is_finite() {
        return Err(AppError::Core(CoreError::Validation(
            "Heading must be a finite number of degrees".into(),
        )));
    }

    let session = require_session(&state, &user).await?;
    let mut session = session.lock().await;
    let heading = session.update_heading(input.heading);
    Ok(Json(DataResponse {
        data: HeadingResponse { heading },
    }))
}

/// POST /api/v1/game/reveal
///
/// Request the reveal code for a reached target.
pub async fn request_reveal(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<RevealResponse>>> {
    let session = require_session(&state, &user).await?;
    let mut session = session.lock().await;
    let code = session.request_reveal().await?.to_owned();
    Ok(Json(DataResponse {
        data: RevealResponse {
            code,
            phase: session.phase(),
        },
    }))
}

/// POST /api/v1/game/scratch
///
/// Report scratch-card progress; past the threshold the session moves to
/// code entry.
pub async fn scratch(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
    Json(input): Json<ScratchRequest>,
) -> AppResult<Json<DataResponse<PhaseResponse>>> {
    if !(0.0..=1.0).contains(&input.fraction) {
        return Err(AppError::Core(CoreError::Validation(
            "Scratch fraction must be between 0 and 1".into(),
        )));
    }

    let session = require_session(&state, &user).await?;
    let mut session = session.lock().await;
    let phase = session.scratch_progress(input.fraction);
    Ok(Json(DataResponse {
        data: PhaseResponse { phase },
    }))
}

/// POST /api/v1/game/ar-opened
///
/// The AR treasure view was opened, which skips the scratch card.
pub async fn ar_opened(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<PhaseResponse>>> {
    let session = require_session(&state, &user).await?;
    let mut session = session.lock().await;
    let phase = session.ar_opened();
    Ok(Json(DataResponse {
        data: PhaseResponse { phase },
    }))
}

/// POST /api/v1/game/verify
///
/// Submit the entered code. On success the session advances to the next
/// target in the chain, or completes; a completed session is dropped from
/// the registry.
pub async fn verify_code(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
    Json(input): Json<VerifyRequest>,
) -> AppResult<Json<DataResponse<VerifyOutcome>>> {
    let session = require_session(&state, &user).await?;
    let mut session = session.lock().await;
    let outcome = session.submit_code(&input.code).await?;
    drop(session);

    if outcome.phase == Phase::Completed {
        state.sessions.remove(user.user_id).await;
    }

    if outcome.degraded {
        tracing::warn!(
            player_id = user.user_id,
            "Code accepted via degraded fallback; nothing recorded or credited"
        );
    } else {
        tracing::info!(
            player_id = user.user_id,
            winning_amount_cents = outcome.winning_amount_cents,
            credited = outcome.credited,
            advanced = outcome.next_target.is_some(),
            "Code verified"
        );
    }

    Ok(Json(DataResponse { data: outcome }))
}
