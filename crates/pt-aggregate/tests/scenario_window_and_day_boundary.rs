//! Scenario: window inclusion by either timestamp, and "today" following
//! the configured day boundary.

use chrono::{DateTime, TimeZone, Utc};
use pt_aggregate::*;
use pt_lifecycle::LifecycleStatus;
use pt_reconcile::reconcile;
use pt_schemas::{ScanEvent, Unit};

fn at(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap()
}

#[test]
fn scenario_old_unit_with_recent_scan_is_in_recent_window() {
    let units = vec![
        Unit::new("OLD", at(1, 8)).with_barcode("B-OLD"),
        Unit::new("IDLE", at(1, 9)).with_barcode("B-IDLE"),
    ];
    let scans = vec![ScanEvent::new("s1", "3@B-OLD", "3", at(6, 10))];
    let report = reconcile(&units, &scans);

    let w = TimeWindow::between(at(6, 0), at(7, 0));
    let a = aggregate(&report.views, &w, at(6, 12));
    assert_eq!(a.total, 1);
    assert_eq!(a.count(LifecycleStatus::Stored), 1);
    assert_eq!(a.count(LifecycleStatus::Scheduled), 0);

    let created_window = TimeWindow::between(at(1, 0), at(2, 0));
    let a = aggregate(&report.views, &created_window, at(6, 12));
    assert_eq!(a.total, 2, "both were created on the 1st");
}

#[test]
fn scenario_today_depends_on_day_boundary() {
    // 17:00Z on the 5th is already the 6th in Shanghai (UTC+8).
    let units = vec![Unit::new("U1", at(1, 0)).with_barcode("B-1")];
    let scans = vec![ScanEvent::new("s1", "1@B-1", "1", at(5, 17))];
    let report = reconcile(&units, &scans);
    let now = at(6, 2);

    let utc = Aggregator::new(DayBoundary::Utc).aggregate(
        &report.views,
        &TimeWindow::unbounded(),
        now,
    );
    assert_eq!(utc.today_count, 0);

    let shanghai: DayBoundary = "Asia/Shanghai".parse().unwrap();
    let local = Aggregator::new(shanghai).aggregate(&report.views, &TimeWindow::unbounded(), now);
    assert_eq!(local.today_count, 1);

    let fixed = Aggregator::new(DayBoundary::fixed_hours(8).unwrap()).aggregate(
        &report.views,
        &TimeWindow::unbounded(),
        now,
    );
    assert_eq!(fixed.today_count, 1);
}
