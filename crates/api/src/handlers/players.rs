//! Handlers for the `/players` resource (device-based registration,
//! presence, and player self-service).

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use trove_core::error::CoreError;
use trove_db::models::player::{Player, UpsertPlayer};
use trove_db::repositories::PlayerRepo;

use crate::auth::jwt::generate_access_token;
use crate::auth::{hash_fingerprint, ROLE_PLAYER};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireOperator, RequirePlayer};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /players/register`.
#[derive(Debug, Deserialize)]
pub struct PlayerRegisterRequest {
    pub display_name: String,
    /// Raw browser-derived device fingerprint. Hashed before storage.
    pub device_fingerprint: String,
}

/// Successful player registration response.
#[derive(Debug, Serialize)]
pub struct PlayerAuthResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub player: Player,
}

/// Response for the operator-facing online count.
#[derive(Debug, Serialize)]
pub struct OnlineCountResponse {
    pub online: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/players/register
///
/// Register this device as a player, or pick up the existing player row
/// for a returning device. Public endpoint; identity is the fingerprint.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<PlayerRegisterRequest>,
) -> AppResult<Json<PlayerAuthResponse>> {
    let display_name = input.display_name.trim();
    if display_name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Display name must not be empty".into(),
        )));
    }
    if input.device_fingerprint.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Device fingerprint must not be empty".into(),
        )));
    }

    let player = PlayerRepo::upsert(
        &state.pool,
        &UpsertPlayer {
            display_name: display_name.to_string(),
            device_fingerprint: hash_fingerprint(input.device_fingerprint.trim()),
        },
    )
    .await?;

    let access_token = generate_access_token(player.id, ROLE_PLAYER, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(player_id = player.id, "Player registered");

    Ok(Json(PlayerAuthResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        player,
    }))
}

/// GET /api/v1/players/me
///
/// The calling player's own row, including total winnings.
pub async fn me(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Player>>> {
    let player = PlayerRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "player",
            id: user.user_id,
        }))?;
    Ok(Json(DataResponse { data: player }))
}

/// POST /api/v1/players/heartbeat
///
/// Bump presence for the calling player.
pub async fn heartbeat(
    RequirePlayer(user): RequirePlayer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<()>>> {
    PlayerRepo::touch(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: () }))
}

/// GET /api/v1/admin/players/online-count
///
/// How many players were seen recently (operator only).
pub async fn online_count(
    RequireOperator(_user): RequireOperator,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<OnlineCountResponse>>> {
    let online = PlayerRepo::online_count(&state.pool).await?;
    Ok(Json(DataResponse {
        data: OnlineCountResponse { online },
    }))
}
