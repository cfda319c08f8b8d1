pub mod admin;
pub mod auth;
pub mod game;
pub mod health;
pub mod locations;
pub mod players;
pub mod teams;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                         bootstrap first operator (public)
/// /auth/login                            operator login (public)
///
/// /admin/operators                       create operator (operator only)
/// /admin/locations                       list, create
/// /admin/locations/{id}                  get, update, delete
/// /admin/locations/{id}/activate         make this the live location (POST)
/// /admin/locations/{id}/deactivate       take it offline (POST)
/// /admin/locations/{id}/codes            issued codes, newest first (GET)
/// /admin/players/online-count            recently seen players (GET)
///
/// /locations/active                      the live location (public, GET)
/// /locations/nearest                     closest active location (public, GET)
///
/// /players/register                      register device as player (public)
/// /players/me                            own row incl. winnings (player)
/// /players/heartbeat                     presence bump (POST, player)
///
/// /game/session                          start (POST), snapshot (GET), abandon (DELETE)
/// /game/position                         feed one GPS fix (POST)
/// /game/heading                          feed one compass reading (POST)
/// /game/reveal                           request reveal code (POST)
/// /game/scratch                          scratch-card progress (POST)
/// /game/ar-opened                        AR view opened (POST)
/// /game/verify                           submit entered code (POST)
///
/// /teams                                 create team at current location (POST)
/// /teams/{id}                            team, members, quorum (GET)
/// /teams/invites                         mint one-use invite (POST, leader)
/// /teams/join                            join via invite code (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Operator authentication (login, first-run bootstrap).
        .nest("/auth", auth::router())
        // Operator console: locations, operators, presence.
        .nest("/admin", admin::router())
        // Public location reads.
        .nest("/locations", locations::router())
        // Player registration and self-service.
        .nest("/players", players::router())
        // The per-player pursuit session.
        .nest("/game", game::router())
        // Team creation, invites, joining.
        .nest("/teams", teams::router())
}
