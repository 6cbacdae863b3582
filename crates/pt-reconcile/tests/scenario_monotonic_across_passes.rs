//! Scenario: successive non-override passes never lower a unit's rank.
//!
//! Scans for one unit trickle in over several passes, deliberately out of
//! time order. After each pass the resolved state is written back the way
//! the store would, and the next pass sees one more scan.

use chrono::{DateTime, TimeZone, Utc};
use pt_lifecycle::{rank, LifecycleStatus};
use pt_reconcile::*;
use pt_schemas::{ScanEvent, Unit};

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
}

/// Mirrors the sync write-back: status only when it or its timestamp moved,
/// `last_scanned_at` whenever it advanced.
fn persist(unit: &mut Unit, view: &ResolvedView) {
    if view.status != unit.status || view.status_timestamp != unit.stored_status_timestamp() {
        unit.status = view.status;
        unit.status_updated_at = Some(view.status_timestamp);
    }
    unit.last_scanned_at = view.last_scanned_at;
}

#[test]
fn scenario_rank_is_non_decreasing_across_passes() {
    let arrivals = vec![
        ScanEvent::new("a", "3@M-1", "3", at(10, 0)),
        ScanEvent::new("b", "1@M-1", "1", at(9, 0)),
        ScanEvent::new("c", "2@M-1", "2", at(11, 0)),
        ScanEvent::new("d", "7@M-1", "7", at(12, 0)),
        ScanEvent::new("e", "1@M-1", "1", at(13, 0)),
    ];

    let mut unit = Unit::new("M1", at(8, 0)).with_barcode("M-1");
    let mut seen: Vec<ScanEvent> = Vec::new();
    let mut last_rank = rank(unit.status).unwrap();

    for scan in arrivals {
        seen.push(scan);
        let r = reconcile(std::slice::from_ref(&unit), &seen);
        let v = r.view("M1").unwrap();

        let now_rank = rank(v.status).unwrap();
        assert!(
            now_rank >= last_rank,
            "rank dropped from {last_rank} to {now_rank} after {} scans",
            seen.len()
        );
        last_rank = now_rank;
        persist(&mut unit, v);
    }

    assert_eq!(unit.status, LifecycleStatus::Stored);
    assert_eq!(unit.last_scanned_at, Some(at(13, 0)));
}
