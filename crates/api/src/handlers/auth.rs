//! Handlers for the `/auth` resource (operator login and bootstrap).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use trove_core::error::CoreError;
use trove_core::types::DbId;
use trove_db::models::operator::CreateOperator;
use trove_db::repositories::OperatorRepo;

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, validate_operator_password, verify_password};
use crate::auth::ROLE_OPERATOR;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireOperator;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register` and `POST /admin/operators`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful authentication response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub operator: OperatorInfo,
}

/// Public operator info embedded in [`AuthResponse`].
#[derive(Debug, Serialize)]
pub struct OperatorInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// First-run bootstrap: creates the initial operator account. Once any
/// operator exists, this endpoint refuses and new accounts must be created
/// through `POST /admin/operators`.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let existing = OperatorRepo::count(&state.pool).await?;
    if existing > 0 {
        return Err(AppError::Core(CoreError::Forbidden(
            "Operator accounts already exist; ask an operator to create yours".into(),
        )));
    }

    let response = create_operator_account(&state, input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/admin/operators
///
/// Create an additional operator account (operator only).
pub async fn create_operator(
    RequireOperator(_user): RequireOperator,
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let response = create_operator_account(&state, input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Returns an operator access token.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let operator = OperatorRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid username or password".into(),
            ))
        })?;

    let password_valid = verify_password(&input.password, &operator.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid username or password".into(),
        )));
    }

    let access_token = generate_access_token(operator.id, ROLE_OPERATOR, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(operator_id = operator.id, "Operator logged in");

    Ok(Json(AuthResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        operator: OperatorInfo {
            id: operator.id,
            username: operator.username,
            email: operator.email,
        },
    }))
}

/// Shared create-and-token path for register and admin creation.
async fn create_operator_account(
    state: &AppState,
    input: RegisterRequest,
) -> AppResult<AuthResponse> {
    if input.username.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Username must not be empty".into(),
        )));
    }
    validate_operator_password(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let operator = OperatorRepo::create(
        &state.pool,
        &CreateOperator {
            username: input.username,
            email: input.email,
            password_hash,
        },
    )
    .await?;

    let access_token = generate_access_token(operator.id, ROLE_OPERATOR, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(operator_id = operator.id, "Operator account created");

    Ok(AuthResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        operator: OperatorInfo {
            id: operator.id,
            username: operator.username,
            email: operator.email,
        },
    })
}
