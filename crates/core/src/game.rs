//! The per-pursuit game state machine.
//!
//! A [`GameSession`] consumes raw GPS fixes and player gestures, smooths
//! positions, decides arrival against a 50 m geofence, and sequences
//! `Approaching -> Reached -> RevealPending -> CodeEntry -> Verified`,
//! advancing to the next target or terminating the chain. All persistence
//! goes through the injected [`GameStore`] trait; there is no ambient
//! store singleton.
//!
//! Consistency model: position updates are processed in arrival order, and
//! the completed-set is re-checked immediately before issuing or claiming a
//! code. The claim itself is a single conditional update on the store side,
//! so a code can be consumed at most once even when two sessions race.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::codes;
use crate::geo::{self, GeoPoint};
use crate::smoothing::{GpsSample, HeadingSmoother, LocationSmoother};
use crate::team;
use crate::types::{Cents, DbId};
use crate::wallet;

/// Geofence radius: within this distance the target counts as reached.
pub const REACH_DISTANCE_M: f64 = 50.0;

/// Scratch-card material fraction that counts as a completed reveal gesture.
pub const SCRATCH_REVEAL_THRESHOLD: f64 = 0.5;

/// Fixes with a worse reported accuracy than this are candidates to drop.
pub const POOR_ACCURACY_CUTOFF_M: f64 = 100.0;

/// If the session recently saw a fix at least this accurate, poor fixes
/// are dropped instead of smoothed in.
pub const GOOD_ACCURACY_M: f64 = 50.0;

// ---------------------------------------------------------------------------
// Actors and targets
// ---------------------------------------------------------------------------

/// Who is pursuing the target: a solo player or a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Player(DbId),
    Team(DbId),
}

/// A location loaded from the store, as the session needs it.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    pub location_id: DbId,
    pub name: String,
    pub point: GeoPoint,
    pub winning_amount_cents: Cents,
    pub minimum_team_size: i32,
}

impl Target {
    /// Whether this target requires a team at all.
    pub fn team_gated(&self) -> bool {
        self.minimum_team_size > 1
    }
}

// ---------------------------------------------------------------------------
// Store seam
// ---------------------------------------------------------------------------

/// Failures crossing the store boundary.
///
/// `Unavailable` marks transient network/backend trouble and is the variant
/// the fallback policy keys on; everything else is `Internal`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Internal(String),
}

/// A successfully claimed (consumed) code row.
#[derive(Debug, Clone)]
pub struct ClaimedCode {
    pub code_id: DbId,
    pub next_location_id: Option<DbId>,
}

/// Snapshot of a team's membership.
#[derive(Debug, Clone)]
pub struct TeamStatus {
    pub leader_id: DbId,
    pub member_ids: Vec<DbId>,
    pub current_location_id: Option<DbId>,
}

impl TeamStatus {
    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }
}

/// The store operations the state machine depends on.
///
/// Implemented by `PgGameStore` in `trove-db` and by in-memory fakes in
/// tests. Every method is expected to be safe to retry.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Load a location by id.
    async fn location(&self, id: DbId) -> Result<Option<Target>, StoreError>;

    /// Whether the actor already completed the location.
    async fn has_completed(&self, actor: Actor, location_id: DbId) -> Result<bool, StoreError>;

    /// Create a fresh unused code for the location and return its value.
    async fn issue_code(
        &self,
        location_id: DbId,
        next_location_id: Option<DbId>,
    ) -> Result<String, StoreError>;

    /// Atomically consume a matching unused code (`used: false -> true`).
    /// Returns `None` when no such code exists.
    async fn claim_code(
        &self,
        code: &str,
        location_id: DbId,
    ) -> Result<Option<ClaimedCode>, StoreError>;

    /// Append-once completion record. Returns `false` when the actor had
    /// already completed the location (nothing was written).
    async fn record_completion(
        &self,
        actor: Actor,
        location_id: DbId,
        code_id: Option<DbId>,
        winning_amount_cents: Cents,
    ) -> Result<bool, StoreError>;

    /// Current membership of a team.
    async fn team_status(&self, team_id: DbId) -> Result<TeamStatus, StoreError>;

    /// Credit winnings to a player's running total.
    async fn credit_player(&self, player_id: DbId, amount_cents: Cents) -> Result<(), StoreError>;

    /// Advance a team to its next location after a completion.
    async fn advance_team(
        &self,
        team_id: DbId,
        next_location_id: Option<DbId>,
    ) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Phases, errors, reports
// ---------------------------------------------------------------------------

/// Pursuit phases. `Verified` is transient inside `submit_code`; the
/// session lands on the next `Approaching` or on `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Approaching,
    Reached,
    RevealPending,
    CodeEntry,
    Completed,
}

/// Whether the session may mint a local code when the store is down.
///
/// `Degraded` trades correctness (no server-side record, no uniqueness
/// guarantee) for availability and must be an explicit operator choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    Strict,
    Degraded,
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Target not reached yet")]
    NotReached,

    #[error("Action not available in the current phase")]
    WrongPhase,

    #[error("Location already completed")]
    AlreadyCompleted,

    #[error("Team quorum not met: {have}/{need} members")]
    QuorumNotMet { have: usize, need: i32 },

    #[error("A team of at least {need} is required for this location")]
    TeamRequired { need: i32 },

    #[error("Code format is invalid")]
    InvalidCode,

    #[error("Code does not match")]
    CodeMismatch,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Snapshot returned from every position update.
#[derive(Debug, Clone, Serialize)]
pub struct PositionReport {
    pub point: GeoPoint,
    pub accuracy_m: f64,
    pub distance_m: f64,
    pub distance_display: String,
    pub bearing_deg: f64,
    pub phase: Phase,
    /// The fix was dropped for poor accuracy; fields reflect the previous
    /// estimate.
    pub fix_ignored: bool,
    /// The actor has already completed the current target.
    pub already_completed: bool,
}

/// Result of a successful code verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    pub winning_amount_cents: Cents,
    /// False when the completion already existed, so nothing was credited.
    pub credited: bool,
    /// The next target in the chain, if the claimed code carried one.
    pub next_target: Option<Target>,
    pub phase: Phase,
    /// The code was accepted via the local degraded-mode fallback rather
    /// than a store claim.
    pub degraded: bool,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One actor's pursuit of the active location chain.
pub struct GameSession {
    store: Arc<dyn GameStore>,
    actor: Actor,
    policy: FallbackPolicy,
    target: Target,
    phase: Phase,
    location_smoother: LocationSmoother,
    heading_smoother: HeadingSmoother,
    last_point: Option<GeoPoint>,
    last_accuracy_m: Option<f64>,
    last_distance_m: Option<f64>,
    issued_code: Option<String>,
    /// Cached completed-set membership for the current target. Refreshed
    /// from the store before reveal and claim.
    completed_cache: Option<bool>,
}

impl GameSession {
    pub fn new(
        store: Arc<dyn GameStore>,
        actor: Actor,
        target: Target,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            store,
            actor,
            policy,
            target,
            phase: Phase::Approaching,
            location_smoother: LocationSmoother::new(),
            heading_smoother: HeadingSmoother::new(),
            last_point: None,
            last_accuracy_m: None,
            last_distance_m: None,
            issued_code: None,
            completed_cache: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn actor(&self) -> Actor {
        self.actor
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn last_distance_m(&self) -> Option<f64> {
        self.last_distance_m
    }

    /// The currently issued reveal code, if any.
    pub fn issued_code(&self) -> Option<&str> {
        self.issued_code.as_deref()
    }

    /// Switch the acting party to a team (after creating or joining one).
    /// Clears the completed-set cache since the actor changed.
    pub fn attach_team(&mut self, team_id: DbId) {
        self.actor = Actor::Team(team_id);
        self.completed_cache = None;
    }

    /// Feed one compass heading, returning the smoothed value.
    pub fn update_heading(&mut self, heading: f64) -> f64 {
        self.heading_smoother.smooth(heading)
    }

    /// Feed one raw GPS fix and run the arrival/retreat transitions.
    pub async fn update_position(&mut self, sample: GpsSample) -> Result<PositionReport, GameError> {
        // Drop clearly poor fixes when we have recently had a good one;
        // a poor fix is still better than no fix at all.
        if sample.accuracy_m > POOR_ACCURACY_CUTOFF_M {
            if let (Some(point), Some(acc)) = (self.last_point, self.last_accuracy_m) {
                if acc < GOOD_ACCURACY_M {
                    return Ok(self.report(point, acc, true));
                }
            }
        }

        let smoothed = self.location_smoother.push(sample);
        let distance = geo::distance_m(smoothed.point, self.target.point);

        self.last_point = Some(smoothed.point);
        self.last_accuracy_m = Some(sample.accuracy_m);
        self.last_distance_m = Some(distance);

        if distance <= REACH_DISTANCE_M {
            if self.phase == Phase::Approaching {
                if self.is_completed().await {
                    return Ok(self.report(smoothed.point, sample.accuracy_m, false));
                }
                self.phase = Phase::Reached;
                tracing::info!(
                    location_id = self.target.location_id,
                    distance_m = distance,
                    "Target reached"
                );
            }
            // Team-gated targets reveal automatically once quorum arrives.
            if self.phase == Phase::Reached && self.target.team_gated() {
                self.try_auto_reveal().await;
            }
        } else if matches!(
            self.phase,
            Phase::Reached | Phase::RevealPending | Phase::CodeEntry
        ) {
            // Walked back out of the geofence: hide the card, void the code.
            self.phase = Phase::Approaching;
            self.issued_code = None;
            tracing::info!(
                location_id = self.target.location_id,
                distance_m = distance,
                "Left geofence, reveal discarded"
            );
        }

        Ok(self.report(smoothed.point, sample.accuracy_m, false))
    }

    /// Re-evaluate team quorum without a position change. Called after a
    /// member joins and from session snapshot polls.
    pub async fn refresh(&mut self) -> Phase {
        if self.phase == Phase::Reached && self.target.team_gated() {
            self.try_auto_reveal().await;
        }
        self.phase
    }

    /// Explicit reveal request (solo targets; for team targets the reveal
    /// is automatic, but an explicit request is honored once quorum holds).
    pub async fn request_reveal(&mut self) -> Result<&str, GameError> {
        match self.phase {
            Phase::Reached => {}
            Phase::Approaching => return Err(GameError::NotReached),
            _ => return Err(GameError::WrongPhase),
        }

        if self.check_completed_fresh().await? {
            return Err(GameError::AlreadyCompleted);
        }

        if self.target.team_gated() {
            let need = self.target.minimum_team_size;
            let Actor::Team(team_id) = self.actor else {
                return Err(GameError::TeamRequired { need });
            };
            let status = self.store.team_status(team_id).await?;
            if !team::quorum_met(status.member_count(), need) {
                return Err(GameError::QuorumNotMet {
                    have: status.member_count(),
                    need,
                });
            }
        }

        self.issue().await?;
        Ok(self.issued_code.as_deref().unwrap_or_default())
    }

    /// Report scratch-card progress; past the threshold the card is
    /// considered revealed and code entry opens.
    pub fn scratch_progress(&mut self, fraction: f64) -> Phase {
        if self.phase == Phase::RevealPending && fraction > SCRATCH_REVEAL_THRESHOLD {
            self.phase = Phase::CodeEntry;
        }
        self.phase
    }

    /// The AR camera view was opened, which counts as a full reveal.
    pub fn ar_opened(&mut self) -> Phase {
        if self.phase == Phase::RevealPending {
            self.phase = Phase::CodeEntry;
        }
        self.phase
    }

    /// Submit a code for verification.
    ///
    /// On success the completion is recorded append-once, winnings are
    /// credited (split across team members, remainder to the leader), and
    /// the session advances to the next target or terminates the chain.
    /// On mismatch the session stays in `CodeEntry` and consumes nothing.
    pub async fn submit_code(&mut self, input: &str) -> Result<VerifyOutcome, GameError> {
        if self.phase != Phase::CodeEntry {
            return Err(GameError::WrongPhase);
        }

        let code = codes::normalize(input);
        if !codes::is_valid_format(&code, codes::LOCATION_CODE_LEN) {
            return Err(GameError::InvalidCode);
        }

        if self.check_completed_fresh().await? {
            return Err(GameError::AlreadyCompleted);
        }

        let (claimed, degraded) = self.claim_with_fallback(&code).await?;
        let Some(claimed) = claimed else {
            return Err(GameError::CodeMismatch);
        };

        let amount = self.target.winning_amount_cents;

        if degraded {
            // Local-only acceptance: the store is down, so nothing is
            // recorded and nothing is credited. Availability over
            // correctness, by explicit operator opt-in.
            tracing::warn!(
                location_id = self.target.location_id,
                "Code accepted in degraded mode; no completion recorded"
            );
            self.issued_code = None;
            self.phase = Phase::Completed;
            return Ok(VerifyOutcome {
                winning_amount_cents: amount,
                credited: false,
                next_target: None,
                phase: self.phase,
                degraded: true,
            });
        }

        let newly = self
            .store
            .record_completion(
                self.actor,
                self.target.location_id,
                Some(claimed.code_id),
                amount,
            )
            .await?;

        if newly {
            self.distribute(amount).await?;
            if let Actor::Team(team_id) = self.actor {
                self.store
                    .advance_team(team_id, claimed.next_location_id)
                    .await?;
            }
        } else {
            tracing::warn!(
                location_id = self.target.location_id,
                "Completion already recorded, skipping credit"
            );
        }

        tracing::info!(
            location_id = self.target.location_id,
            winning_amount_cents = amount,
            credited = newly,
            degraded,
            "Code verified"
        );

        let next_target = match claimed.next_location_id {
            Some(next_id) => self.store.location(next_id).await?,
            None => None,
        };

        self.issued_code = None;
        self.completed_cache = None;
        self.location_smoother.reset();
        self.last_distance_m = None;

        self.phase = match &next_target {
            Some(next) => {
                self.target = next.clone();
                Phase::Approaching
            }
            None => Phase::Completed,
        };

        Ok(VerifyOutcome {
            winning_amount_cents: amount,
            credited: newly,
            next_target,
            phase: self.phase,
            degraded,
        })
    }

    // -- internals ----------------------------------------------------------

    fn report(&self, point: GeoPoint, accuracy_m: f64, fix_ignored: bool) -> PositionReport {
        let distance = self
            .last_distance_m
            .unwrap_or_else(|| geo::distance_m(point, self.target.point));
        PositionReport {
            point,
            accuracy_m,
            distance_m: distance,
            distance_display: geo::format_distance(distance),
            bearing_deg: geo::bearing_deg(point, self.target.point),
            phase: self.phase,
            fix_ignored,
            already_completed: self.completed_cache.unwrap_or(false),
        }
    }

    /// Cached completed-set check for the arrival decision. A store
    /// failure here degrades to "not completed"; the claim path re-checks
    /// with real error handling.
    async fn is_completed(&mut self) -> bool {
        if let Some(cached) = self.completed_cache {
            return cached;
        }
        let completed = match self
            .store
            .has_completed(self.actor, self.target.location_id)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Completed-set check failed, assuming not completed");
                false
            }
        };
        self.completed_cache = Some(completed);
        completed
    }

    /// Fresh completed-set check used as the re-entrancy guard before
    /// reveal and claim. Store failure falls back to the cached value.
    async fn check_completed_fresh(&mut self) -> Result<bool, GameError> {
        match self
            .store
            .has_completed(self.actor, self.target.location_id)
            .await
        {
            Ok(v) => {
                self.completed_cache = Some(v);
                Ok(v)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Fresh completed-set check failed, using cached value");
                Ok(self.completed_cache.unwrap_or(false))
            }
        }
    }

    /// Auto-reveal for team targets; quorum shortfalls and store hiccups
    /// leave the phase untouched.
    async fn try_auto_reveal(&mut self) {
        let Actor::Team(team_id) = self.actor else {
            return;
        };
        let status = match self.store.team_status(team_id).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Team status unavailable, reveal deferred");
                return;
            }
        };
        if !team::quorum_met(status.member_count(), self.target.minimum_team_size) {
            return;
        }
        if let Err(e) = self.issue().await {
            tracing::warn!(error = %e, "Automatic team reveal failed");
        }
    }

    /// Issue a code from the store, or locally under the degraded policy.
    async fn issue(&mut self) -> Result<(), GameError> {
        match self.store.issue_code(self.target.location_id, None).await {
            Ok(code) => {
                self.issued_code = Some(code);
            }
            Err(StoreError::Unavailable(reason)) if self.policy == FallbackPolicy::Degraded => {
                tracing::warn!(
                    %reason,
                    location_id = self.target.location_id,
                    "Store unavailable, issuing local fallback code"
                );
                self.issued_code = Some(codes::generate_location_code());
            }
            Err(e) => return Err(e.into()),
        }
        self.phase = Phase::RevealPending;
        Ok(())
    }

    /// Claim the code at the store, retrying an unavailable store once and
    /// then falling back to local equality under the degraded policy.
    async fn claim_with_fallback(
        &mut self,
        code: &str,
    ) -> Result<(Option<ClaimedCode>, bool), GameError> {
        let location_id = self.target.location_id;
        let first = self.store.claim_code(code, location_id).await;
        let result = match first {
            Err(StoreError::Unavailable(_)) => self.store.claim_code(code, location_id).await,
            other => other,
        };

        match result {
            Ok(claimed) => Ok((claimed, false)),
            Err(StoreError::Unavailable(reason)) => {
                if self.policy == FallbackPolicy::Degraded
                    && self.issued_code.as_deref() == Some(code)
                {
                    tracing::warn!(
                        %reason,
                        location_id,
                        "Store unavailable, accepting code via local fallback"
                    );
                    Ok((
                        Some(ClaimedCode {
                            // Never read on the degraded path.
                            code_id: 0,
                            next_location_id: None,
                        }),
                        true,
                    ))
                } else {
                    Err(StoreError::Unavailable(reason).into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Credit a completion: the full amount for a solo player, an even
    /// split with the remainder to the leader for a team.
    async fn distribute(&self, amount: Cents) -> Result<(), GameError> {
        match self.actor {
            Actor::Player(player_id) => {
                self.store.credit_player(player_id, amount).await?;
            }
            Actor::Team(team_id) => {
                let status = self.store.team_status(team_id).await?;
                let split = wallet::split(amount, status.member_count());
                for member_id in &status.member_ids {
                    let share = if *member_id == status.leader_id {
                        split.leader_share()
                    } else {
                        split.per_member
                    };
                    if share > 0 {
                        self.store.credit_player(*member_id, share).await?;
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoothing::GpsSample;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    // One degree of latitude in meters on the test sphere.
    const METERS_PER_DEG_LAT: f64 = 111_194.9;

    #[derive(Default)]
    struct MockState {
        locations: HashMap<DbId, Target>,
        codes: Vec<(DbId, String, DbId, Option<DbId>, bool)>, // id, code, location, next, used
        completions: HashSet<(Actor, DbId)>,
        credits: HashMap<DbId, Cents>,
        teams: HashMap<DbId, TeamStatus>,
        next_code_id: DbId,
    }

    #[derive(Default)]
    struct MockStore {
        state: Mutex<MockState>,
        unavailable: AtomicBool,
    }

    impl MockStore {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn add_location(&self, target: Target) {
            self.state
                .lock()
                .unwrap()
                .locations
                .insert(target.location_id, target);
        }

        fn set_team(&self, team_id: DbId, leader: DbId, members: Vec<DbId>, location: DbId) {
            self.state.lock().unwrap().teams.insert(
                team_id,
                TeamStatus {
                    leader_id: leader,
                    member_ids: members,
                    current_location_id: Some(location),
                },
            );
        }

        fn set_unavailable(&self, value: bool) {
            self.unavailable.store(value, Ordering::SeqCst);
        }

        fn credits(&self, player: DbId) -> Cents {
            *self
                .state
                .lock()
                .unwrap()
                .credits
                .get(&player)
                .unwrap_or(&0)
        }

        fn completion_count(&self) -> usize {
            self.state.lock().unwrap().completions.len()
        }

        fn check_available(&self) -> Result<(), StoreError> {
            if self.unavailable.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("mock outage".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl GameStore for MockStore {
        async fn location(&self, id: DbId) -> Result<Option<Target>, StoreError> {
            self.check_available()?;
            Ok(self.state.lock().unwrap().locations.get(&id).cloned())
        }

        async fn has_completed(&self, actor: Actor, location_id: DbId) -> Result<bool, StoreError> {
            self.check_available()?;
            Ok(self
                .state
                .lock()
                .unwrap()
                .completions
                .contains(&(actor, location_id)))
        }

        async fn issue_code(
            &self,
            location_id: DbId,
            next_location_id: Option<DbId>,
        ) -> Result<String, StoreError> {
            self.check_available()?;
            let mut state = self.state.lock().unwrap();
            state.next_code_id += 1;
            let id = state.next_code_id;
            let code = codes::generate_location_code();
            state
                .codes
                .push((id, code.clone(), location_id, next_location_id, false));
            Ok(code)
        }

        async fn claim_code(
            &self,
            code: &str,
            location_id: DbId,
        ) -> Result<Option<ClaimedCode>, StoreError> {
            self.check_available()?;
            let mut state = self.state.lock().unwrap();
            for row in state.codes.iter_mut() {
                if row.1 == code && row.2 == location_id && !row.4 {
                    row.4 = true;
                    return Ok(Some(ClaimedCode {
                        code_id: row.0,
                        next_location_id: row.3,
                    }));
                }
            }
            Ok(None)
        }

        async fn record_completion(
            &self,
            actor: Actor,
            location_id: DbId,
            _code_id: Option<DbId>,
            _winning_amount_cents: Cents,
        ) -> Result<bool, StoreError> {
            self.check_available()?;
            Ok(self
                .state
                .lock()
                .unwrap()
                .completions
                .insert((actor, location_id)))
        }

        async fn team_status(&self, team_id: DbId) -> Result<TeamStatus, StoreError> {
            self.check_available()?;
            self.state
                .lock()
                .unwrap()
                .teams
                .get(&team_id)
                .cloned()
                .ok_or_else(|| StoreError::Internal("unknown team".into()))
        }

        async fn credit_player(
            &self,
            player_id: DbId,
            amount_cents: Cents,
        ) -> Result<(), StoreError> {
            self.check_available()?;
            *self
                .state
                .lock()
                .unwrap()
                .credits
                .entry(player_id)
                .or_insert(0) += amount_cents;
            Ok(())
        }

        async fn advance_team(
            &self,
            team_id: DbId,
            next_location_id: Option<DbId>,
        ) -> Result<(), StoreError> {
            self.check_available()?;
            if let Some(team) = self.state.lock().unwrap().teams.get_mut(&team_id) {
                team.current_location_id = next_location_id;
            }
            Ok(())
        }
    }

    fn target(id: DbId, lat: f64, lon: f64, amount: Cents, min_team: i32) -> Target {
        Target {
            location_id: id,
            name: format!("Spot {id}"),
            point: GeoPoint::new(lat, lon),
            winning_amount_cents: amount,
            minimum_team_size: min_team,
        }
    }

    fn fix(lat: f64, lon: f64, accuracy: f64, ms: i64) -> GpsSample {
        GpsSample {
            point: GeoPoint::new(lat, lon),
            accuracy_m: accuracy,
            captured_at: Utc.timestamp_millis_opt(ms).unwrap(),
        }
    }

    /// Walk the session inside the geofence with stable fixes.
    async fn arrive(session: &mut GameSession, base_ms: i64) -> PositionReport {
        let p = session.target().point;
        let mut report = None;
        for i in 0..3 {
            report = Some(
                session
                    .update_position(fix(p.lat, p.lon, 5.0, base_ms + i * 1000))
                    .await
                    .unwrap(),
            );
        }
        report.unwrap()
    }

    #[tokio::test]
    async fn full_chain_approach_reveal_verify_advance() {
        let store = MockStore::new();
        let start = target(1, 21.855204, 70.249010, 5_000, 1);
        let next = target(2, 21.860000, 70.250000, 7_500, 1);
        store.add_location(start.clone());
        store.add_location(next.clone());
        // Pre-issue the chained code the way the reveal path will claim it.
        let code = {
            let mut state = store.state.lock().unwrap();
            state.next_code_id = 100;
            let code = "K7QX2M".to_string();
            state.codes.push((100, code.clone(), 1, Some(2), false));
            code
        };

        let mut session = GameSession::new(
            store.clone(),
            Actor::Player(42),
            start.clone(),
            FallbackPolicy::Strict,
        );

        // 1000 m due south of the target renders as kilometers.
        let away_lat = start.point.lat - 1000.0 / METERS_PER_DEG_LAT;
        let report = session
            .update_position(fix(away_lat, start.point.lon, 5.0, 0))
            .await
            .unwrap();
        assert_eq!(report.phase, Phase::Approaching);
        assert_eq!(report.distance_display, "1.00 km");
        assert!((report.bearing_deg - 0.0).abs() < 1.0);

        // Move inside the geofence.
        let report = arrive(&mut session, 10_000).await;
        assert_eq!(report.phase, Phase::Reached);
        assert!(report.distance_m <= REACH_DISTANCE_M);

        // Reveal issues a 6-char alphanumeric code.
        let revealed = session.request_reveal().await.unwrap().to_string();
        assert!(codes::is_valid_format(&revealed, codes::LOCATION_CODE_LEN));
        assert_eq!(session.phase(), Phase::RevealPending);

        // Scratch past the threshold opens code entry.
        assert_eq!(session.scratch_progress(0.4), Phase::RevealPending);
        assert_eq!(session.scratch_progress(0.6), Phase::CodeEntry);

        // Submit the pre-issued chained code (lowercase, padded: the
        // machine normalizes).
        let outcome = session.submit_code(&format!(" {} ", code.to_lowercase())).await.unwrap();
        assert!(outcome.credited);
        assert_eq!(outcome.winning_amount_cents, 5_000);
        assert_eq!(store.credits(42), 5_000);

        // The chain advances to the next location's stored coordinates.
        let next_target = outcome.next_target.expect("chained code carries a next target");
        assert_eq!(next_target.location_id, 2);
        assert_eq!(session.target().point, next.point);
        assert_eq!(session.phase(), Phase::Approaching);
    }

    #[tokio::test]
    async fn terminal_code_completes_the_chain() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 2_500, 1);
        store.add_location(spot.clone());

        let mut session = GameSession::new(
            store.clone(),
            Actor::Player(7),
            spot,
            FallbackPolicy::Strict,
        );
        arrive(&mut session, 0).await;
        let code = session.request_reveal().await.unwrap().to_string();
        session.ar_opened();
        let outcome = session.submit_code(&code).await.unwrap();
        assert!(outcome.next_target.is_none());
        assert_eq!(outcome.phase, Phase::Completed);
        assert_eq!(session.phase(), Phase::Completed);
    }

    #[tokio::test]
    async fn leaving_the_geofence_discards_the_reveal() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 1_000, 1);
        store.add_location(spot.clone());

        let mut session = GameSession::new(
            store.clone(),
            Actor::Player(7),
            spot.clone(),
            FallbackPolicy::Strict,
        );
        arrive(&mut session, 0).await;
        session.request_reveal().await.unwrap();
        assert!(session.issued_code().is_some());

        // Walk 1 km away: back to Approaching, code voided.
        let away = spot.point.lat + 1000.0 / METERS_PER_DEG_LAT;
        // Push enough fixes that the smoothed position leaves the fence.
        for i in 0..5 {
            session
                .update_position(fix(away, spot.point.lon, 5.0, 20_000 + i * 1000))
                .await
                .unwrap();
        }
        assert_eq!(session.phase(), Phase::Approaching);
        assert!(session.issued_code().is_none());

        // Scratching now does nothing.
        assert_eq!(session.scratch_progress(1.0), Phase::Approaching);
    }

    #[tokio::test]
    async fn wrong_code_stays_in_code_entry_and_consumes_nothing() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 1_000, 1);
        store.add_location(spot.clone());

        let mut session = GameSession::new(
            store.clone(),
            Actor::Player(7),
            spot,
            FallbackPolicy::Strict,
        );
        arrive(&mut session, 0).await;
        let good = session.request_reveal().await.unwrap().to_string();
        session.scratch_progress(0.9);

        let wrong = if good == "AAAAAA" { "BBBBBB" } else { "AAAAAA" };
        assert_matches!(
            session.submit_code(wrong).await,
            Err(GameError::CodeMismatch)
        );
        assert_eq!(session.phase(), Phase::CodeEntry);
        assert_eq!(store.completion_count(), 0);

        // The real code still verifies afterwards.
        let outcome = session.submit_code(&good).await.unwrap();
        assert!(outcome.credited);
    }

    #[tokio::test]
    async fn completion_is_idempotent_and_credits_once() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 5_000, 1);
        store.add_location(spot.clone());

        let mut session = GameSession::new(
            store.clone(),
            Actor::Player(7),
            spot.clone(),
            FallbackPolicy::Strict,
        );
        arrive(&mut session, 0).await;
        let code = session.request_reveal().await.unwrap().to_string();
        session.scratch_progress(1.0);
        let outcome = session.submit_code(&code).await.unwrap();
        assert!(outcome.credited);
        assert_eq!(store.completion_count(), 1);
        assert_eq!(store.credits(7), 5_000);

        // A second pursuit of the same location by the same actor: the
        // used code no longer claims, and arrival is blocked by the
        // completed-set.
        let mut again = GameSession::new(
            store.clone(),
            Actor::Player(7),
            spot.clone(),
            FallbackPolicy::Strict,
        );
        let report = arrive(&mut again, 60_000).await;
        assert_eq!(report.phase, Phase::Approaching);
        assert!(report.already_completed);
        assert_matches!(again.request_reveal().await, Err(GameError::NotReached));
        assert_eq!(store.completion_count(), 1);
        assert_eq!(store.credits(7), 5_000);
    }

    #[tokio::test]
    async fn team_quorum_gates_the_reveal() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 9_000, 3);
        store.add_location(spot.clone());
        store.set_team(5, 100, vec![100, 101], 1);

        let mut session = GameSession::new(
            store.clone(),
            Actor::Team(5),
            spot.clone(),
            FallbackPolicy::Strict,
        );

        // Two members: reached, but no automatic reveal.
        let report = arrive(&mut session, 0).await;
        assert_eq!(report.phase, Phase::Reached);
        assert_matches!(
            session.request_reveal().await,
            Err(GameError::QuorumNotMet { have: 2, need: 3 })
        );

        // Third member joins; the next refresh reveals automatically.
        store.set_team(5, 100, vec![100, 101, 102], 1);
        assert_eq!(session.refresh().await, Phase::RevealPending);
        assert!(session.issued_code().is_some());
    }

    #[tokio::test]
    async fn solo_actor_cannot_attempt_team_gated_target() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 9_000, 2);
        store.add_location(spot.clone());

        let mut session = GameSession::new(
            store.clone(),
            Actor::Player(7),
            spot,
            FallbackPolicy::Strict,
        );
        arrive(&mut session, 0).await;
        assert_matches!(
            session.request_reveal().await,
            Err(GameError::TeamRequired { need: 2 })
        );
    }

    #[tokio::test]
    async fn team_completion_splits_winnings_with_remainder_to_leader() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 10_000, 3);
        store.add_location(spot.clone());
        store.set_team(5, 100, vec![100, 101, 102], 1);

        let mut session = GameSession::new(
            store.clone(),
            Actor::Team(5),
            spot,
            FallbackPolicy::Strict,
        );
        arrive(&mut session, 0).await;
        assert_eq!(session.refresh().await, Phase::RevealPending);
        let code = session.issued_code().unwrap().to_string();
        session.scratch_progress(0.8);
        let outcome = session.submit_code(&code).await.unwrap();

        assert!(outcome.credited);
        // 10000 / 3 = 3333 each, remainder 1 to the leader.
        assert_eq!(store.credits(100), 3_334);
        assert_eq!(store.credits(101), 3_333);
        assert_eq!(store.credits(102), 3_333);

        // The team advanced off the completed location.
        let status = store.team_status(5).await.unwrap();
        assert_eq!(status.current_location_id, None);
    }

    #[tokio::test]
    async fn strict_policy_refuses_local_codes_when_store_is_down() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 1_000, 1);
        store.add_location(spot.clone());

        let mut session = GameSession::new(
            store.clone(),
            Actor::Player(7),
            spot,
            FallbackPolicy::Strict,
        );
        arrive(&mut session, 0).await;

        store.set_unavailable(true);
        assert_matches!(
            session.request_reveal().await,
            Err(GameError::Store(StoreError::Unavailable(_)))
        );
        assert_eq!(session.phase(), Phase::Reached);
    }

    #[tokio::test]
    async fn degraded_policy_issues_and_accepts_local_codes() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 1_000, 1);
        store.add_location(spot.clone());

        let mut session = GameSession::new(
            store.clone(),
            Actor::Player(7),
            spot,
            FallbackPolicy::Degraded,
        );
        arrive(&mut session, 0).await;

        store.set_unavailable(true);
        let code = session.request_reveal().await.unwrap().to_string();
        assert!(codes::is_valid_format(&code, codes::LOCATION_CODE_LEN));
        assert_eq!(session.phase(), Phase::RevealPending);
        session.scratch_progress(0.9);

        // A code that does not match the locally issued one cannot be
        // accepted while the store is down.
        assert_matches!(
            session.submit_code("ZZZZZZ").await,
            Err(GameError::Store(StoreError::Unavailable(_)))
        );
        assert_eq!(session.phase(), Phase::CodeEntry);

        // The locally issued code is accepted, but nothing is recorded or
        // credited: the weaker contract of degraded mode.
        let outcome = session.submit_code(&code).await.unwrap();
        assert!(outcome.degraded);
        assert!(!outcome.credited);
        assert_eq!(outcome.phase, Phase::Completed);
        assert_eq!(store.completion_count(), 0);
        assert_eq!(store.credits(7), 0);
    }

    #[tokio::test]
    async fn poor_accuracy_fix_is_ignored_after_a_good_one() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 1_000, 1);
        store.add_location(spot.clone());

        let mut session = GameSession::new(
            store.clone(),
            Actor::Player(7),
            spot.clone(),
            FallbackPolicy::Strict,
        );
        session
            .update_position(fix(10.0, 20.0, 5.0, 0))
            .await
            .unwrap();

        // A wild 500 m-accuracy fix far away does not move the estimate.
        let report = session
            .update_position(fix(11.0, 21.0, 500.0, 1000))
            .await
            .unwrap();
        assert!(report.fix_ignored);
        assert_eq!(report.point, GeoPoint::new(10.0, 20.0));

        // Without a good prior fix, a poor fix is still consumed.
        let mut cold = GameSession::new(
            store.clone(),
            Actor::Player(8),
            spot,
            FallbackPolicy::Strict,
        );
        let report = cold
            .update_position(fix(11.0, 21.0, 500.0, 0))
            .await
            .unwrap();
        assert!(!report.fix_ignored);
    }

    #[tokio::test]
    async fn heading_updates_flow_through_the_smoother() {
        let store = MockStore::new();
        let spot = target(1, 10.0, 20.0, 1_000, 1);
        store.add_location(spot.clone());
        let mut session = GameSession::new(
            store,
            Actor::Player(7),
            spot,
            FallbackPolicy::Strict,
        );

        assert_eq!(session.update_heading(359.0), 359.0);
        let next = session.update_heading(1.0);
        assert!((next - 359.6).abs() < 1e-9);
    }
}
