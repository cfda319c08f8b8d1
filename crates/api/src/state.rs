use std::sync::Arc;

use trove_db::store::PgGameStore;

use crate::config::ServerConfig;
use crate::session::SessionManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: trove_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Postgres-backed store handed to every game session.
    pub store: Arc<PgGameStore>,
    /// In-memory per-player game sessions.
    pub sessions: Arc<SessionManager>,
}
