use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pt_lifecycle::{status_map, LifecycleStatus, StatusGrouped};
use pt_reconcile::ResolvedView;
use serde::{Deserialize, Serialize};

use crate::{DayBoundary, TimeWindow};

/// Dashboard counts for one window.
///
/// `by_status` always carries all seven keys, zero-filled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub total: u64,
    pub today_count: u64,
    pub by_status: BTreeMap<LifecycleStatus, u64>,
    pub real_count: u64,
    pub virtual_count: u64,
}

impl Aggregate {
    fn zeroed() -> Self {
        Self {
            total: 0,
            today_count: 0,
            by_status: status_map(|_| 0),
            real_count: 0,
            virtual_count: 0,
        }
    }

    pub fn count(&self, status: LifecycleStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Aggregator {
    day: DayBoundary,
}

impl Aggregator {
    pub fn new(day: DayBoundary) -> Self {
        Self { day }
    }

    pub fn day_boundary(&self) -> DayBoundary {
        self.day
    }

    /// Count `views` inside `window`.
    ///
    /// `today_count` looks at every view, not only the windowed ones: it
    /// answers "how many units changed status today" whatever range the
    /// dashboard is showing.
    pub fn aggregate(
        &self,
        views: &[ResolvedView],
        window: &TimeWindow,
        now: DateTime<Utc>,
    ) -> Aggregate {
        let today = self.day.day_window(now);
        let mut out = Aggregate::zeroed();

        for v in views {
            if today.contains(v.status_timestamp) {
                out.today_count += 1;
            }
            if !in_window(v, window) {
                continue;
            }
            out.total += 1;
            if v.is_virtual {
                out.virtual_count += 1;
            } else {
                out.real_count += 1;
            }
            *out.by_status.entry(v.status).or_insert(0) += 1;
        }

        out
    }
}

/// [`Aggregator::aggregate`] with a UTC day.
pub fn aggregate(views: &[ResolvedView], window: &TimeWindow, now: DateTime<Utc>) -> Aggregate {
    Aggregator::default().aggregate(views, window, now)
}

/// Windowed views bucketed by status, input order kept within a bucket.
pub fn group_by_status(
    views: &[ResolvedView],
    window: &TimeWindow,
) -> StatusGrouped<Vec<ResolvedView>> {
    let mut out = status_map(|_| Vec::new());
    for v in views.iter().filter(|v| in_window(v, window)) {
        out.entry(v.status).or_default().push(v.clone());
    }
    out
}

fn in_window(v: &ResolvedView, window: &TimeWindow) -> bool {
    window.contains(v.created_at) || window.contains(v.status_timestamp)
}
