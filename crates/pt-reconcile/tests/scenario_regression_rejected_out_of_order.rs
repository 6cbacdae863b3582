//! Scenario: out-of-order scans must not walk a unit backwards.
//!
//! U1 is `Stored`. Two scans arrive in this order:
//!   - station 2 (CornerCleaned) at 10:00
//!   - station 3 (Stored)        at 09:00
//!
//! The latest-by-time event is station 2 at 10:00, its rank is below the
//! stored rank, so it is discarded with a `StatusRegressionRejected`
//! diagnostic and U1 stays `Stored`.

use chrono::{DateTime, TimeZone, Utc};
use pt_lifecycle::LifecycleStatus;
use pt_reconcile::*;
use pt_schemas::{ScanEvent, Unit};

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
}

fn u1() -> Unit {
    Unit::new("U1", at(6, 0))
        .with_barcode("W-1001")
        .with_status(LifecycleStatus::Stored, at(8, 0))
}

#[test]
fn scenario_late_lower_stage_scan_is_rejected() {
    let scans = vec![
        ScanEvent::new("e-10", "2@W-1001", "2", at(10, 0)),
        ScanEvent::new("e-09", "3@W-1001", "3", at(9, 0)),
    ];

    let r = reconcile(&[u1()], &scans);
    let v = r.view("U1").unwrap();

    assert_eq!(v.status, LifecycleStatus::Stored, "status must not regress");
    assert_eq!(v.status_timestamp, at(8, 0), "status timestamp untouched");
    assert_eq!(
        v.last_scanned_at,
        Some(at(10, 0)),
        "newer scan still advances last_scanned_at"
    );

    assert_eq!(
        r.diagnostics,
        vec![ReconcileDiagnostic::StatusRegressionRejected {
            unit_id: "U1".into(),
            barcode: "W-1001".into(),
            scan_id: "e-10".into(),
            current: LifecycleStatus::Stored,
            candidate: LifecycleStatus::CornerCleaned,
        }]
    );
    assert_eq!(
        r.diagnostics_of(DiagnosticKind::StatusRegressionRejected).count(),
        1
    );
}

#[test]
fn scenario_shipped_unit_accepts_scans_without_regressing() {
    let unit = Unit::new("U9", at(6, 0))
        .with_barcode("W-9")
        .with_status(LifecycleStatus::Shipped, at(8, 0));
    let scans = vec![ScanEvent::new("late", "1@W-9", "1", at(12, 0))];

    let r = reconcile(&[unit], &scans);
    let v = r.view("U9").unwrap();
    assert_eq!(v.status, LifecycleStatus::Shipped);
    assert_eq!(v.last_scanned_at, Some(at(12, 0)));
    assert_eq!(
        r.diagnostics_of(DiagnosticKind::StatusRegressionRejected).count(),
        1
    );
}

#[test]
fn scenario_override_after_regression_wins() {
    let scans = vec![
        ScanEvent::new("e-10", "2@W-1001", "2", at(10, 0)),
        ScanEvent::new("fix", "W-1001", "manual", at(10, 30)).as_override(LifecycleStatus::Cut),
    ];

    let r = reconcile(&[u1()], &scans);
    let v = r.view("U1").unwrap();
    assert_eq!(v.status, LifecycleStatus::Cut);
    assert_eq!(v.status_timestamp, at(10, 30));
    assert!(v.manual_override);
    assert!(r.diagnostics.is_empty());
}

#[test]
fn scenario_malformed_scan_is_reported_and_batch_continues() {
    let units = vec![u1(), Unit::new("U2", at(6, 0)).with_barcode("W-2")];
    let scans = vec![
        ScanEvent::new("bad", "1@", "1", at(9, 0)),
        ScanEvent::new("ok", "1@W-2", "1", at(9, 1)),
    ];

    let r = reconcile(&units, &scans);
    assert_eq!(r.view("U2").unwrap().status, LifecycleStatus::Cut);
    assert_eq!(
        r.diagnostics_of(DiagnosticKind::InvalidBarcodeFormat).count(),
        1
    );
    assert!(
        r.virtual_views().next().is_none(),
        "malformed scan must not become a virtual unit"
    );
}
