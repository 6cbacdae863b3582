//! Write-time status guard.
//!
//! Two reconciliation passes (say a scheduled sync and a manual edit) can
//! race on one unit. The store must not just take whichever write lands
//! last: it re-derives the comparison against what it holds right now.
//!
//! # Invariants
//!
//! - **Last resolved write wins by `status_timestamp`**, not by arrival: an
//!   incoming status older than the stored one is stale.
//! - **Rank never drops** on a non-override write.
//! - **Identical writes are no-ops**, so repeated triggers cause no churn.
//! - Pure, no IO; the store applies the decision.

use chrono::{DateTime, Utc};
use pt_lifecycle::{is_forward_transition, LifecycleStatus};

/// What the store currently holds for a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoredStatus {
    pub status: LifecycleStatus,
    pub status_timestamp: DateTime<Utc>,
}

/// Result of checking one incoming write against the stored status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteDecision {
    /// Newer and not a regression. Apply it.
    Apply,
    /// Same status, same timestamp.
    Unchanged,
    /// Incoming status is older than the stored one.
    Stale {
        stored_at: DateTime<Utc>,
        incoming_at: DateTime<Utc>,
    },
    /// Backward, non-override.
    Regression {
        stored: LifecycleStatus,
        incoming: LifecycleStatus,
    },
}

impl WriteDecision {
    pub fn is_apply(&self) -> bool {
        matches!(self, WriteDecision::Apply)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            WriteDecision::Stale { .. } | WriteDecision::Regression { .. }
        )
    }
}

/// Decide whether `incoming` may replace `stored`.
pub fn check_write(
    stored: &StoredStatus,
    incoming: LifecycleStatus,
    incoming_at: DateTime<Utc>,
    manual_override: bool,
) -> WriteDecision {
    if stored.status == incoming && stored.status_timestamp == incoming_at {
        return WriteDecision::Unchanged;
    }
    if incoming_at < stored.status_timestamp {
        return WriteDecision::Stale {
            stored_at: stored.status_timestamp,
            incoming_at,
        };
    }
    if !is_forward_transition(stored.status, incoming, manual_override) {
        return WriteDecision::Regression {
            stored: stored.status,
            incoming,
        };
    }
    WriteDecision::Apply
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, h, 0, 0).unwrap()
    }

    fn stored(status: LifecycleStatus, h: u32) -> StoredStatus {
        StoredStatus {
            status,
            status_timestamp: at(h),
        }
    }

    #[test]
    fn newer_forward_write_applies() {
        let d = check_write(&stored(LifecycleStatus::Cut, 8), LifecycleStatus::Stored, at(9), false);
        assert_eq!(d, WriteDecision::Apply);
    }

    #[test]
    fn identical_write_is_unchanged() {
        let d = check_write(&stored(LifecycleStatus::Cut, 8), LifecycleStatus::Cut, at(8), false);
        assert_eq!(d, WriteDecision::Unchanged);
        assert!(!d.is_rejected());
    }

    #[test]
    fn older_write_is_stale_even_when_forward() {
        let d = check_write(&stored(LifecycleStatus::Cut, 9), LifecycleStatus::Stored, at(8), false);
        assert_eq!(
            d,
            WriteDecision::Stale {
                stored_at: at(9),
                incoming_at: at(8)
            }
        );
    }

    #[test]
    fn older_override_is_stale_too() {
        let d = check_write(&stored(LifecycleStatus::Stored, 9), LifecycleStatus::Cut, at(8), true);
        assert!(matches!(d, WriteDecision::Stale { .. }));
    }

    #[test]
    fn newer_backward_write_needs_override() {
        let s = stored(LifecycleStatus::Stored, 8);
        assert_eq!(
            check_write(&s, LifecycleStatus::Cut, at(9), false),
            WriteDecision::Regression {
                stored: LifecycleStatus::Stored,
                incoming: LifecycleStatus::Cut
            }
        );
        assert!(check_write(&s, LifecycleStatus::Cut, at(9), true).is_apply());
    }
}
