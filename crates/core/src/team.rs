//! Team coordination rules: invites, quorum, and code allocation policy.
//!
//! The persistence side (creating rows, marking invites used) lives in
//! `trove-db`; this module holds the pure decision logic so it can be
//! enforced identically from handlers and from the game session.

use crate::types::{DbId, Timestamp};

/// How long a team invite stays valid after creation, in seconds.
pub const INVITE_TTL_SECS: i64 = 3_600;

/// How many fresh team codes to try before giving up on a collision storm.
pub const MAX_TEAM_CODE_ATTEMPTS: usize = 10;

/// Member roles within a team. The creator is the single leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Leader,
    Member,
}

impl TeamRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "leader",
            Self::Member => "member",
        }
    }
}

/// The fields of a team invite that matter for join validation.
#[derive(Debug, Clone)]
pub struct InviteCheck {
    pub team_id: DbId,
    pub location_id: DbId,
    pub expires_at: Timestamp,
    pub used: bool,
}

/// Why a join-by-invite attempt was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Invite has already been used")]
    InviteUsed,

    #[error("Invite has expired")]
    InviteExpired,

    #[error("You must be at the team's location to join")]
    LocationMismatch,

    #[error("You are already a member of this team")]
    AlreadyMember,
}

/// Validate a join-by-invite attempt.
///
/// `joiner_location_id` is the location the joining player is currently
/// tracking; it must match both the invite's recorded location and the
/// team's current location, so a player cannot join a team for a spot they
/// have not physically reached.
pub fn validate_join(
    invite: &InviteCheck,
    team_current_location_id: DbId,
    joiner_location_id: DbId,
    already_member: bool,
    now: Timestamp,
) -> Result<(), JoinError> {
    if invite.used {
        return Err(JoinError::InviteUsed);
    }
    if now >= invite.expires_at {
        return Err(JoinError::InviteExpired);
    }
    if joiner_location_id != invite.location_id || joiner_location_id != team_current_location_id {
        return Err(JoinError::LocationMismatch);
    }
    if already_member {
        return Err(JoinError::AlreadyMember);
    }
    Ok(())
}

/// Whether a team meets the quorum required by a location.
///
/// Solo locations (`minimum_team_size == 1`) always pass.
pub fn quorum_met(member_count: usize, minimum_team_size: i32) -> bool {
    member_count as i64 >= i64::from(minimum_team_size.max(1))
}

/// Compute the expiry timestamp for an invite created at `created_at`.
pub fn invite_expiry(created_at: Timestamp) -> Timestamp {
    created_at + chrono::Duration::seconds(INVITE_TTL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn ts(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn invite(location_id: DbId, expires_at: Timestamp, used: bool) -> InviteCheck {
        InviteCheck {
            team_id: 1,
            location_id,
            expires_at,
            used,
        }
    }

    #[test]
    fn valid_join_passes() {
        let inv = invite(7, ts(3600), false);
        assert_eq!(validate_join(&inv, 7, 7, false, ts(100)), Ok(()));
    }

    #[test]
    fn used_invite_is_rejected() {
        let inv = invite(7, ts(3600), true);
        assert_eq!(
            validate_join(&inv, 7, 7, false, ts(100)),
            Err(JoinError::InviteUsed)
        );
    }

    #[test]
    fn expired_invite_is_rejected() {
        let inv = invite(7, ts(3600), false);
        assert_eq!(
            validate_join(&inv, 7, 7, false, ts(3600)),
            Err(JoinError::InviteExpired)
        );
        assert_eq!(
            validate_join(&inv, 7, 7, false, ts(9999)),
            Err(JoinError::InviteExpired)
        );
    }

    #[test]
    fn joiner_at_wrong_location_is_rejected() {
        // Structurally valid, unexpired invite; the joiner simply is not
        // tracking the invite's location.
        let inv = invite(7, ts(3600), false);
        assert_eq!(
            validate_join(&inv, 7, 8, false, ts(100)),
            Err(JoinError::LocationMismatch)
        );
    }

    #[test]
    fn team_that_moved_on_is_rejected() {
        // The invite still names the old location but the team advanced.
        let inv = invite(7, ts(3600), false);
        assert_eq!(
            validate_join(&inv, 9, 7, false, ts(100)),
            Err(JoinError::LocationMismatch)
        );
    }

    #[test]
    fn duplicate_membership_is_rejected() {
        let inv = invite(7, ts(3600), false);
        assert_eq!(
            validate_join(&inv, 7, 7, true, ts(100)),
            Err(JoinError::AlreadyMember)
        );
    }

    #[test]
    fn invite_expiry_is_one_hour() {
        let created = ts(1_000_000);
        assert_eq!(invite_expiry(created), created + Duration::hours(1));
    }

    #[test]
    fn quorum_boundaries() {
        assert!(quorum_met(1, 1));
        assert!(quorum_met(5, 1));
        assert!(!quorum_met(2, 3));
        assert!(quorum_met(3, 3));
        assert!(quorum_met(4, 3));
        // A nonsense minimum of zero behaves like one.
        assert!(quorum_met(1, 0));
        assert!(!quorum_met(0, 0));
    }
}
