use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use trove_core::error::CoreError;
use trove_core::game::{GameError, StoreError};
use trove_core::team::JoinError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `trove_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A game state machine error.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A team join rejection.
    #[error(transparent)]
    Join(#[from] JoinError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Game state machine errors ---
            AppError::Game(game) => classify_game_error(game),

            // --- Team join rejections ---
            AppError::Join(join) => {
                let (status, code) = match join {
                    JoinError::InviteUsed => (StatusCode::CONFLICT, "INVITE_USED"),
                    JoinError::InviteExpired => (StatusCode::GONE, "INVITE_EXPIRED"),
                    JoinError::LocationMismatch => (StatusCode::CONFLICT, "LOCATION_MISMATCH"),
                    JoinError::AlreadyMember => (StatusCode::CONFLICT, "ALREADY_MEMBER"),
                };
                (status, code, join.to_string())
            }

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map game state machine errors onto HTTP statuses.
///
/// Phase and precondition violations are conflicts, code problems are
/// client errors, and a down store is a 503 so clients can distinguish
/// "you are wrong" from "we are down".
fn classify_game_error(err: &GameError) -> (StatusCode, &'static str, String) {
    match err {
        GameError::NotReached => (StatusCode::CONFLICT, "NOT_REACHED", err.to_string()),
        GameError::WrongPhase => (StatusCode::CONFLICT, "WRONG_PHASE", err.to_string()),
        GameError::AlreadyCompleted => {
            (StatusCode::CONFLICT, "ALREADY_COMPLETED", err.to_string())
        }
        GameError::QuorumNotMet { .. } => {
            (StatusCode::CONFLICT, "QUORUM_NOT_MET", err.to_string())
        }
        GameError::TeamRequired { .. } => {
            (StatusCode::CONFLICT, "TEAM_REQUIRED", err.to_string())
        }
        GameError::InvalidCode => (StatusCode::BAD_REQUEST, "INVALID_CODE", err.to_string()),
        GameError::CodeMismatch => (StatusCode::BAD_REQUEST, "CODE_MISMATCH", err.to_string()),
        GameError::Store(StoreError::Unavailable(msg)) => {
            tracing::error!(error = %msg, "Store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "The game store is temporarily unavailable".to_string(),
            )
        }
        GameError::Store(StoreError::Internal(msg)) => {
            tracing::error!(error = %msg, "Store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
