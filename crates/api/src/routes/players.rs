//! Route definitions for the `/players` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::players;
use crate::state::AppState;

/// Routes mounted at `/players`.
///
/// ```text
/// POST /register   -> register device (public)
/// GET  /me         -> own row (player)
/// POST /heartbeat  -> presence bump (player)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(players::register))
        .route("/me", get(players::me))
        .route("/heartbeat", post(players::heartbeat))
}
