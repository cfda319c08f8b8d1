//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does
//! not match. Use these in route handlers to enforce authorization at the
//! type level.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use trove_core::error::CoreError;

use super::auth::AuthUser;
use crate::auth::{ROLE_OPERATOR, ROLE_PLAYER};
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `operator` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn operator_only(RequireOperator(user): RequireOperator) -> AppResult<Json<()>> {
///     // user is guaranteed to be an operator here
///     Ok(Json(()))
/// }
/// ```
pub struct RequireOperator(pub AuthUser);

impl FromRequestParts<AppState> for RequireOperator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_OPERATOR {
            return Err(AppError::Core(CoreError::Forbidden(
                "Operator role required".into(),
            )));
        }
        Ok(RequireOperator(user))
    }
}

/// Requires the `player` role. Rejects with 403 Forbidden otherwise.
///
/// Operator tokens are deliberately rejected here: the game endpoints
/// mutate per-player session state that an operator does not have.
pub struct RequirePlayer(pub AuthUser);

impl FromRequestParts<AppState> for RequirePlayer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_PLAYER {
            return Err(AppError::Core(CoreError::Forbidden(
                "Player role required".into(),
            )));
        }
        Ok(RequirePlayer(user))
    }
}
