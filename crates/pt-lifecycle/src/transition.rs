use crate::LifecycleStatus;

/// Rank along the canonical production path. `None` for `Scanned`.
pub fn rank(status: LifecycleStatus) -> Option<u8> {
    match status {
        LifecycleStatus::Scheduled => Some(0),
        LifecycleStatus::Cut => Some(1),
        LifecycleStatus::CornerCleaned => Some(2),
        LifecycleStatus::Stored => Some(3),
        LifecycleStatus::PartiallyShipped => Some(4),
        LifecycleStatus::Shipped => Some(5),
        LifecycleStatus::Scanned => None,
    }
}

/// Shape of a status change, used for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Transition {
    Forward,
    Same,
    Backward,
    /// One side is `Scanned` and the other is ranked.
    Incomparable,
}

pub fn classify_transition(from: LifecycleStatus, to: LifecycleStatus) -> Transition {
    if from == to {
        return Transition::Same;
    }
    match (rank(from), rank(to)) {
        (Some(f), Some(t)) if t > f => Transition::Forward,
        (Some(f), Some(t)) if t == f => Transition::Same,
        (Some(_), Some(_)) => Transition::Backward,
        _ => Transition::Incomparable,
    }
}

/// `true` iff moving `from -> to` keeps or advances rank, or the change is a
/// manual override.
///
/// `Scanned` against a ranked status is incomparable and never forward
/// without an override.
pub fn is_forward_transition(
    from: LifecycleStatus,
    to: LifecycleStatus,
    manual_override: bool,
) -> bool {
    if manual_override {
        return true;
    }
    matches!(
        classify_transition(from, to),
        Transition::Forward | Transition::Same
    )
}
