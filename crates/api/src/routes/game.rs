//! Route definitions for the `/game` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::game;
use crate::state::AppState;

/// Routes mounted at `/game`. All require the player role.
///
/// ```text
/// POST   /session    -> start pursuit of the active location
/// GET    /session    -> session snapshot (re-evaluates quorum)
/// DELETE /session    -> abandon pursuit
/// POST   /position   -> feed one GPS fix
/// POST   /heading    -> feed one compass reading
/// POST   /reveal     -> request reveal code
/// POST   /scratch    -> scratch-card progress
/// POST   /ar-opened  -> AR view opened (skips scratch)
/// POST   /verify     -> submit entered code
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/session",
            get(game::get_session)
                .post(game::start_session)
                .delete(game::end_session),
        )
        .route("/position", post(game::update_position))
        .route("/heading", post(game::update_heading))
        .route("/reveal", post(game::request_reveal))
        .route("/scratch", post(game::scratch))
        .route("/ar-opened", post(game::ar_opened))
        .route("/verify", post(game::verify_code))
}
