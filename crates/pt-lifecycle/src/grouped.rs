use std::collections::BTreeMap;

use crate::LifecycleStatus;

/// Any structure keyed by status at the top level.
pub type StatusGrouped<T> = BTreeMap<LifecycleStatus, T>;

/// A map with every status present, each seeded by `init`.
pub fn status_map<T>(mut init: impl FnMut(LifecycleStatus) -> T) -> StatusGrouped<T> {
    LifecycleStatus::ALL.iter().map(|s| (*s, init(*s))).collect()
}
