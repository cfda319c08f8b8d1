//! Route definitions for the public `/locations` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::locations;
use crate::state::AppState;

/// Routes mounted at `/locations`. No authentication; write access lives
/// under `/admin/locations`.
///
/// ```text
/// GET /active   -> the live location
/// GET /nearest  -> closest active location to ?latitude=..&longitude=..
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/active", get(locations::active))
        .route("/nearest", get(locations::nearest))
}
