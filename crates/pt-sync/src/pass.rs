//! One reconciliation pass against the stores.
//!
//! # Flow
//!
//! 1. Snapshot units and scans.
//! 2. Reconcile (pure).
//! 3. For each changed real unit, under its barcode lock: guarded status
//!    write, then advance `last_scanned_at`.
//!
//! Nothing is written before step 3. Virtual units are reported, never
//! stored. Diagnostics are logged and, when an audit writer is attached,
//! recorded one event each.

use std::collections::BTreeMap;
use std::sync::Arc;

use pt_audit::{
    AuditWriter, EV_PASS_COMPLETED, EV_PASS_STARTED, EV_SCAN_RECORDED, EV_SCAN_REJECTED,
    EV_STATUS_APPLIED, EV_WRITE_REGRESSION, EV_WRITE_STALE, TOPIC_RECONCILE, TOPIC_SCAN,
};
use pt_reconcile::writeback::WriteDecision;
use pt_reconcile::{
    reconcile_with, BarcodeMatch, DeviceStageTable, ReconcileDiagnostic, ReconcileReport,
};
use pt_schemas::{ScanEvent, Unit};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    record_scan, BarcodeLocks, Clock, NewScan, PermissionProvider, ScanFilter, ScanStore,
    SyncError, SystemClock, UnitFilter, UnitStore,
};
use pt_aggregate::DayBoundary;
use pt_view::RolePermissions;

#[derive(Clone, Debug, Serialize)]
pub struct SyncOutcome {
    pub pass_id: Uuid,
    pub report: ReconcileReport,
    /// Status writes the store accepted.
    pub applied: usize,
    /// Refused because the store already holds something newer.
    pub skipped_stale: usize,
    /// Refused at write time as a rank regression.
    pub skipped_regression: usize,
}

pub struct SyncPass {
    pub(crate) units: Arc<dyn UnitStore>,
    pub(crate) scans: Arc<dyn ScanStore>,
    pub(crate) devices: DeviceStageTable,
    pub(crate) day: DayBoundary,
    pub(crate) permissions: Arc<dyn PermissionProvider>,
    pub(crate) clock: Arc<dyn Clock>,
    locks: Arc<BarcodeLocks>,
    audit: Option<Arc<Mutex<AuditWriter>>>,
}

impl SyncPass {
    pub fn new(units: Arc<dyn UnitStore>, scans: Arc<dyn ScanStore>) -> Self {
        Self {
            units,
            scans,
            devices: DeviceStageTable::standard(),
            day: DayBoundary::Utc,
            permissions: Arc::new(RolePermissions::default()),
            clock: Arc::new(SystemClock),
            locks: Arc::new(BarcodeLocks::new()),
            audit: None,
        }
    }

    pub fn with_devices(mut self, devices: DeviceStageTable) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_day_boundary(mut self, day: DayBoundary) -> Self {
        self.day = day;
        self
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionProvider>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share locks with other passes over the same stores.
    pub fn with_locks(mut self, locks: Arc<BarcodeLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_audit(mut self, audit: Arc<Mutex<AuditWriter>>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Snapshot and reconcile without writing anything.
    pub async fn preview(&self, filter: &UnitFilter) -> Result<(Vec<Unit>, ReconcileReport), SyncError> {
        let units = self.units.list_units(filter).await?;
        let scans = self
            .scans
            .list_scan_events(&ScanFilter::for_units(filter))
            .await?;
        let report = reconcile_with(&units, &scans, &self.devices);
        Ok((units, report))
    }

    pub async fn run(&self, filter: &UnitFilter) -> Result<SyncOutcome, SyncError> {
        let pass_id = Uuid::new_v4();
        info!(%pass_id, "sync pass started");
        self.audit_event(pass_id, EV_PASS_STARTED, json!({ "filter": filter.barcodes }))
            .await?;

        let (units, report) = self.preview(filter).await?;
        let stored: BTreeMap<&str, &Unit> = units.iter().map(|u| (u.id.as_str(), u)).collect();

        for diag in &report.diagnostics {
            log_diagnostic(diag);
            let payload = serde_json::to_value(diag).unwrap_or(Value::Null);
            let kind = payload
                .get("kind")
                .and_then(Value::as_str)
                .unwrap_or("DIAGNOSTIC")
                .to_string();
            self.audit_event(pass_id, &kind, payload).await?;
        }

        let mut outcome = SyncOutcome {
            pass_id,
            report: ReconcileReport::default(),
            applied: 0,
            skipped_stale: 0,
            skipped_regression: 0,
        };

        for view in report.real_views().filter(|v| v.changed) {
            let Some(unit) = stored.get(view.unit_id.as_str()) else {
                continue;
            };
            let _guard = match &view.barcode {
                Some(b) => Some(self.locks.lock(b).await),
                None => None,
            };

            let status_moved = view.status != unit.status
                || view.status_timestamp != unit.stored_status_timestamp();
            if status_moved {
                let decision = self
                    .units
                    .update_unit_status(
                        &view.unit_id,
                        view.status,
                        view.status_timestamp,
                        view.manual_override,
                    )
                    .await?;
                let payload = json!({
                    "unit_id": view.unit_id,
                    "barcode": view.barcode,
                    "from": unit.status,
                    "to": view.status,
                    "status_timestamp": view.status_timestamp,
                    "source_scan_id": view.source_scan_id,
                    "manual_override": view.manual_override,
                });
                match decision {
                    WriteDecision::Apply => {
                        outcome.applied += 1;
                        debug!(unit_id = %view.unit_id, from = %unit.status, to = %view.status, "status applied");
                        self.audit_event(pass_id, EV_STATUS_APPLIED, payload).await?;
                    }
                    WriteDecision::Stale { stored_at, .. } => {
                        outcome.skipped_stale += 1;
                        warn!(unit_id = %view.unit_id, %stored_at, "write skipped: store holds a newer status");
                        self.audit_event(pass_id, EV_WRITE_STALE, payload).await?;
                    }
                    WriteDecision::Regression { stored, incoming } => {
                        outcome.skipped_regression += 1;
                        warn!(unit_id = %view.unit_id, %stored, %incoming, "write skipped: regression");
                        self.audit_event(pass_id, EV_WRITE_REGRESSION, payload).await?;
                    }
                    WriteDecision::Unchanged => {}
                }
            }

            if let Some(scanned_at) = view.last_scanned_at {
                if unit.last_scanned_at.map_or(true, |prev| scanned_at > prev) {
                    self.units.touch_last_scanned(&view.unit_id, scanned_at).await?;
                }
            }
        }
        // Per-view guards are gone; drop lock entries nobody else holds.
        self.locks.prune().await;

        info!(
            %pass_id,
            units = units.len(),
            views = report.views.len(),
            diagnostics = report.diagnostics.len(),
            applied = outcome.applied,
            skipped_stale = outcome.skipped_stale,
            skipped_regression = outcome.skipped_regression,
            "sync pass completed"
        );
        self.audit_event(
            pass_id,
            EV_PASS_COMPLETED,
            json!({
                "applied": outcome.applied,
                "skipped_stale": outcome.skipped_stale,
                "skipped_regression": outcome.skipped_regression,
                "diagnostics": report.diagnostics.len(),
            }),
        )
        .await?;

        outcome.report = report;
        Ok(outcome)
    }

    /// [`record_scan`] against this pass's scan store and station table,
    /// with the outcome audited under its own id.
    pub async fn record_scan(&self, scan: NewScan) -> Result<(ScanEvent, BarcodeMatch), SyncError> {
        let audit_id = Uuid::new_v4();
        let request = json!({
            "raw_identifier": scan.raw_identifier,
            "device_id": scan.device_id,
            "occurred_at": scan.occurred_at,
            "explicit_status": scan.explicit_status,
            "manual_override": scan.manual_override,
        });

        match record_scan(self.scans.as_ref(), &self.devices, scan).await {
            Ok((ev, matched)) => {
                let payload = json!({
                    "scan_id": ev.id,
                    "barcode": matched.canonical_barcode,
                    "inferred_status": matched.inferred_status,
                    "unknown_device": matched.unknown_device,
                    "scan": request,
                });
                self.audit_to(audit_id, TOPIC_SCAN, EV_SCAN_RECORDED, payload)
                    .await?;
                Ok((ev, matched))
            }
            Err(e) => {
                let payload = json!({ "reason": e.to_string(), "scan": request });
                self.audit_to(audit_id, TOPIC_SCAN, EV_SCAN_REJECTED, payload)
                    .await?;
                Err(e)
            }
        }
    }

    async fn audit_event(&self, pass_id: Uuid, event_type: &str, payload: Value) -> Result<(), SyncError> {
        self.audit_to(pass_id, TOPIC_RECONCILE, event_type, payload).await
    }

    async fn audit_to(
        &self,
        id: Uuid,
        topic: &str,
        event_type: &str,
        payload: Value,
    ) -> Result<(), SyncError> {
        if let Some(audit) = &self.audit {
            let mut w = audit.lock().await;
            w.append_at(id, self.clock.now(), topic, event_type, payload)?;
        }
        Ok(())
    }
}

fn log_diagnostic(diag: &ReconcileDiagnostic) {
    match diag {
        ReconcileDiagnostic::InvalidBarcodeFormat { scan_id, raw_identifier } => {
            warn!(%scan_id, raw = %raw_identifier, "invalid barcode format")
        }
        ReconcileDiagnostic::UnknownDevice { scan_id, device_id } => {
            warn!(%scan_id, device = %device_id, "unknown device")
        }
        ReconcileDiagnostic::DuplicateUnitBarcode {
            barcode,
            kept_unit_id,
            ignored_unit_id,
        } => warn!(%barcode, kept = %kept_unit_id, ignored = %ignored_unit_id, "duplicate unit barcode"),
        ReconcileDiagnostic::StatusRegressionRejected {
            unit_id,
            scan_id,
            current,
            candidate,
            ..
        } => info!(%unit_id, %scan_id, %current, %candidate, "status regression rejected"),
    }
}
