//! Scenario: dashboards always get every status bucket, virtual units
//! included, and the same answer for the same input.

use chrono::{DateTime, TimeZone, Utc};
use pt_aggregate::*;
use pt_lifecycle::LifecycleStatus;
use pt_reconcile::reconcile;
use pt_schemas::{ScanEvent, Unit};

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
}

#[test]
fn scenario_every_bucket_present_with_mixed_units() {
    let units = vec![
        Unit::new("U1", at(7, 0)).with_barcode("B-1"),
        Unit::new("U2", at(7, 5)).with_barcode("B-2"),
        Unit::new("U3", at(7, 10)),
    ];
    let scans = vec![
        ScanEvent::new("s1", "1@B-1", "1", at(8, 0)),
        ScanEvent::new("s2", "3@B-2", "3", at(8, 30)),
        ScanEvent::new("s3", "2@XYZ123", "2", at(9, 0)),
    ];
    let report = reconcile(&units, &scans);

    let a = aggregate(&report.views, &TimeWindow::unbounded(), at(12, 0));
    assert_eq!(a.by_status.len(), LifecycleStatus::ALL.len());
    assert_eq!(a.total, 4);
    assert_eq!(a.real_count, 3);
    assert_eq!(a.virtual_count, 1);
    assert_eq!(a.count(LifecycleStatus::Scheduled), 1);
    assert_eq!(a.count(LifecycleStatus::Cut), 1);
    assert_eq!(a.count(LifecycleStatus::Stored), 1);
    assert_eq!(a.count(LifecycleStatus::CornerCleaned), 1);
    assert_eq!(a.count(LifecycleStatus::Shipped), 0);
    assert_eq!(a.by_status.values().sum::<u64>(), a.total);
}

#[test]
fn scenario_unmatched_scan_lands_in_corner_cleaned_bucket() {
    let scans = vec![ScanEvent::new("42", "2@XYZ123", "2", at(9, 0))];
    let report = reconcile(&[], &scans);

    let g = group_by_status(&report.views, &TimeWindow::unbounded());
    let bucket = &g[&LifecycleStatus::CornerCleaned];
    assert_eq!(bucket.len(), 1);
    assert_eq!(bucket[0].unit_id, "scan_42");
    assert!(bucket[0].is_virtual);

    let a = aggregate(&report.views, &TimeWindow::unbounded(), at(12, 0));
    assert_eq!(a.count(LifecycleStatus::CornerCleaned), 1);
    assert_eq!(a.today_count, 1);
}

#[test]
fn scenario_aggregate_is_deterministic_under_reordering() {
    let units = vec![
        Unit::new("U1", at(7, 0)).with_barcode("B-1"),
        Unit::new("U2", at(7, 5)).with_barcode("B-2"),
    ];
    let scans = vec![
        ScanEvent::new("s1", "1@B-1", "1", at(8, 0)),
        ScanEvent::new("s2", "2@B-1", "2", at(8, 10)),
        ScanEvent::new("s3", "3@B-2", "3", at(8, 30)),
        ScanEvent::new("s4", "1@LOOSE", "1", at(9, 0)),
    ];
    let mut units_rev = units.clone();
    units_rev.reverse();
    let mut scans_rev = scans.clone();
    scans_rev.reverse();

    let w = TimeWindow::since(at(0, 0));
    let a = aggregate(&reconcile(&units, &scans).views, &w, at(12, 0));
    let b = aggregate(&reconcile(&units_rev, &scans_rev).views, &w, at(12, 0));
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}
