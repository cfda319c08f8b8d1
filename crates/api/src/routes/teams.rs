//! Route definitions for the `/teams` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::teams;
use crate::state::AppState;

/// Routes mounted at `/teams`. All require the player role.
///
/// ```text
/// POST /          -> create team at current location
/// GET  /{id}      -> team, members, quorum
/// POST /invites   -> mint one-use invite (leader only)
/// POST /join      -> join via invite code
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(teams::create))
        .route("/{id}", get(teams::get))
        .route("/invites", post(teams::create_invite))
        .route("/join", post(teams::join))
}
