//! Winnings arithmetic.
//!
//! Amounts are integer cents throughout. A team completion splits the
//! location's winning amount into equal floor shares; the division
//! remainder goes to the team leader so every cent is accounted for.

use crate::types::Cents;

/// Result of splitting a winning amount across a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinningsSplit {
    /// Amount credited to every member, leader included.
    pub per_member: Cents,
    /// Extra cents credited to the leader on top of the member share.
    pub remainder: Cents,
}

impl WinningsSplit {
    /// Total credited to the leader.
    pub fn leader_share(&self) -> Cents {
        self.per_member + self.remainder
    }
}

/// Split `amount` across `member_count` members.
///
/// A member count of zero is treated as one so a degenerate team still
/// credits the full amount rather than dividing by zero.
pub fn split(amount: Cents, member_count: usize) -> WinningsSplit {
    let n = member_count.max(1) as Cents;
    WinningsSplit {
        per_member: amount / n,
        remainder: amount % n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solo_split_is_the_full_amount() {
        let s = split(10_000, 1);
        assert_eq!(s.per_member, 10_000);
        assert_eq!(s.remainder, 0);
    }

    #[test]
    fn even_split_has_no_remainder() {
        let s = split(9_000, 3);
        assert_eq!(s.per_member, 3_000);
        assert_eq!(s.remainder, 0);
        assert_eq!(s.leader_share(), 3_000);
    }

    #[test]
    fn remainder_goes_to_the_leader() {
        let s = split(10_000, 3);
        assert_eq!(s.per_member, 3_333);
        assert_eq!(s.remainder, 1);
        assert_eq!(s.leader_share(), 3_334);
        // Total is preserved.
        assert_eq!(s.per_member * 3 + s.remainder, 10_000);
    }

    #[test]
    fn zero_members_treated_as_one() {
        let s = split(500, 0);
        assert_eq!(s.per_member, 500);
        assert_eq!(s.remainder, 0);
    }

    #[test]
    fn zero_amount_splits_to_nothing() {
        let s = split(0, 4);
        assert_eq!(s.per_member, 0);
        assert_eq!(s.remainder, 0);
    }
}
