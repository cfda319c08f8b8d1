//! Route definitions for the operator console under `/admin`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{auth, locations, players};
use crate::state::AppState;

/// Routes mounted at `/admin`. All handlers enforce the operator role.
///
/// ```text
/// POST   /operators                  -> create operator
/// GET    /locations                  -> list
/// POST   /locations                  -> create
/// GET    /locations/{id}             -> get
/// PUT    /locations/{id}             -> update
/// DELETE /locations/{id}             -> delete
/// POST   /locations/{id}/activate    -> exclusive activation
/// POST   /locations/{id}/deactivate  -> deactivate
/// GET    /locations/{id}/codes       -> issued codes
/// GET    /players/online-count       -> presence count
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/operators", post(auth::create_operator))
        .route("/locations", get(locations::list).post(locations::create))
        .route(
            "/locations/{id}",
            get(locations::get)
                .put(locations::update)
                .delete(locations::delete),
        )
        .route("/locations/{id}/activate", post(locations::activate))
        .route("/locations/{id}/deactivate", post(locations::deactivate))
        .route("/locations/{id}/codes", get(locations::codes))
        .route("/players/online-count", get(players::online_count))
}
