use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pt_aggregate::{Aggregator, TimeWindow};
use pt_lifecycle::LifecycleStatus;
use pt_reconcile::ResolvedView;
use pt_view::filter_by_permission;
use serde::Serialize;
use tracing::debug;

use crate::{SyncError, SyncPass, UnitFilter};

/// Role-scoped dashboard counts.
///
/// Counts only cover statuses the role may see, so `total` always equals
/// the sum of `by_status`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub role: String,
    pub window: TimeWindow,
    pub now: DateTime<Utc>,
    pub total: u64,
    pub today_count: u64,
    pub real_count: u64,
    pub virtual_count: u64,
    pub by_status: BTreeMap<LifecycleStatus, u64>,
}

impl SyncPass {
    /// Reconcile a fresh snapshot, aggregate it, filter by role. Read-only.
    pub async fn dashboard(&self, role: &str, window: &TimeWindow) -> Result<Dashboard, SyncError> {
        let allowed = self.permissions.allowed_statuses(role).await?;
        let (_, report) = self.preview(&UnitFilter::all()).await?;
        let now = self.clock.now();

        let visible: Vec<ResolvedView> = report
            .views
            .into_iter()
            .filter(|v| allowed.allows(v.status))
            .collect();
        let agg = Aggregator::new(self.day).aggregate(&visible, window, now);

        debug!(
            role,
            all = allowed.is_all(),
            visible = visible.len(),
            "dashboard built"
        );

        Ok(Dashboard {
            role: role.to_string(),
            window: *window,
            now,
            total: agg.total,
            today_count: agg.today_count,
            real_count: agg.real_count,
            virtual_count: agg.virtual_count,
            by_status: filter_by_permission(&agg.by_status, &allowed),
        })
    }
}
