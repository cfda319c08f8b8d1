//! In-memory game session registry.
//!
//! Each player gets at most one live [`GameSession`], held behind its own
//! mutex so concurrent requests for different players never contend. The
//! outer map lock is only taken for insert/lookup/remove.
//!
//! Entries record when they were last looked up; sessions a client walked
//! away from without `DELETE /game/session` are reclaimed by the periodic
//! [`sweep_idle`](SessionManager::sweep_idle) pass.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use trove_core::game::GameSession;
use trove_core::types::DbId;

struct Entry {
    session: Arc<Mutex<GameSession>>,
    last_seen: Instant,
}

/// Registry of live sessions, keyed by player id.
#[derive(Default)]
pub struct SessionManager {
    sessions: Mutex<HashMap<DbId, Entry>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the session for a player.
    pub async fn insert(&self, player_id: DbId, session: GameSession) -> Arc<Mutex<GameSession>> {
        let session = Arc::new(Mutex::new(session));
        self.sessions.lock().await.insert(
            player_id,
            Entry {
                session: Arc::clone(&session),
                last_seen: Instant::now(),
            },
        );
        session
    }

    /// Look up the live session for a player, refreshing its idle clock.
    pub async fn get(&self, player_id: DbId) -> Option<Arc<Mutex<GameSession>>> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(&player_id)?;
        entry.last_seen = Instant::now();
        Some(Arc::clone(&entry.session))
    }

    /// Drop a player's session, if any.
    pub async fn remove(&self, player_id: DbId) {
        self.sessions.lock().await.remove(&player_id);
    }

    /// Drop sessions not touched for at least `max_idle`. Returns how many
    /// were evicted.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() < max_idle);
        before - sessions.len()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
