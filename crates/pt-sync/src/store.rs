//! Collaborator boundaries consumed by the sync layer.
//!
//! Implementations must be `Send + Sync` so one store can be shared by
//! concurrent passes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use pt_aggregate::TimeWindow;
use pt_lifecycle::LifecycleStatus;
use pt_reconcile::writeback::WriteDecision;
use pt_reconcile::DeviceStageTable;
use pt_schemas::{ScanEvent, Unit};
use pt_view::{AllowedStatuses, RolePermissions};

use crate::StoreError;

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitFilter {
    /// Only units carrying one of these barcodes. `None` = every unit.
    pub barcodes: Option<BTreeSet<String>>,
}

impl UnitFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn barcodes<I, S>(barcodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            barcodes: Some(barcodes.into_iter().map(Into::into).collect()),
        }
    }

    pub fn matches(&self, unit: &Unit) -> bool {
        match &self.barcodes {
            None => true,
            Some(set) => unit.barcode_key().is_some_and(|b| set.contains(b)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanFilter {
    /// Only scans whose canonical barcode is in this set.
    pub barcodes: Option<BTreeSet<String>>,
    /// Only scans that occurred inside this window.
    pub occurred: TimeWindow,
}

impl ScanFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_units(filter: &UnitFilter) -> Self {
        Self {
            barcodes: filter.barcodes.clone(),
            occurred: TimeWindow::unbounded(),
        }
    }

    /// Malformed identifiers only pass an unrestricted barcode filter, so
    /// the engine still gets to diagnose them on full passes.
    pub fn matches(&self, scan: &ScanEvent) -> bool {
        if !self.occurred.contains(scan.occurred_at) {
            return false;
        }
        match &self.barcodes {
            None => true,
            Some(set) => DeviceStageTable::empty()
                .match_barcode(&scan.raw_identifier, &scan.device_id)
                .is_ok_and(|m| set.contains(&m.canonical_barcode)),
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait UnitStore: Send + Sync {
    async fn list_units(&self, filter: &UnitFilter) -> Result<Vec<Unit>, StoreError>;

    /// Guarded status write. The store compares against what it holds at
    /// write time (see [`pt_reconcile::writeback::check_write`]) and only
    /// persists on [`WriteDecision::Apply`].
    async fn update_unit_status(
        &self,
        unit_id: &str,
        status: LifecycleStatus,
        status_timestamp: DateTime<Utc>,
        manual_override: bool,
    ) -> Result<WriteDecision, StoreError>;

    /// Advance `last_scanned_at`; never moves it backwards.
    async fn touch_last_scanned(
        &self,
        unit_id: &str,
        scanned_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait ScanStore: Send + Sync {
    async fn list_scan_events(&self, filter: &ScanFilter) -> Result<Vec<ScanEvent>, StoreError>;

    /// Append one immutable scan event; the store assigns its id.
    async fn append_scan_event(
        &self,
        raw_identifier: &str,
        device_id: &str,
        occurred_at: DateTime<Utc>,
        explicit_status: Option<LifecycleStatus>,
        manual_override: bool,
    ) -> Result<ScanEvent, StoreError>;
}

#[async_trait::async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn allowed_statuses(&self, role: &str) -> Result<AllowedStatuses, StoreError>;
}

/// Static role table from configuration.
#[async_trait::async_trait]
impl PermissionProvider for RolePermissions {
    async fn allowed_statuses(&self, role: &str) -> Result<AllowedStatuses, StoreError> {
        Ok(self.allowed_for(role))
    }
}
