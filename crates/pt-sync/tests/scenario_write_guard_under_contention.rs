//! Scenario: the store, not the pass, has the final say on recency and
//! rank, and concurrent passes agree on the outcome.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use pt_lifecycle::LifecycleStatus;
use pt_reconcile::DiagnosticKind;
use pt_schemas::{ScanEvent, Unit};
use pt_sync::*;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
}

#[tokio::test]
async fn scenario_newer_manual_edit_wins_over_older_scan() {
    // Office set Cut at 10:00; the warehouse scan is from 09:00.
    let store = Arc::new(InMemoryStore::from_snapshot(
        vec![Unit::new("U1", at(7, 0))
            .with_barcode("B-1")
            .with_status(LifecycleStatus::Cut, at(10, 0))],
        vec![ScanEvent::new("s1", "3@B-1", "3", at(9, 0))],
    ));

    let out = SyncPass::new(store.clone(), store.clone())
        .run(&UnitFilter::all())
        .await
        .unwrap();

    assert_eq!(out.applied, 0);
    assert_eq!(out.skipped_stale, 0, "engine already sees the scan is superseded");
    assert_eq!(out.report.view("U1").unwrap().status, LifecycleStatus::Cut);
    let u = store.unit("U1").await.unwrap();
    assert_eq!(u.status, LifecycleStatus::Cut);
    assert_eq!(u.status_updated_at, Some(at(10, 0)));
    assert_eq!(u.last_scanned_at, Some(at(9, 0)), "scan time still recorded");
}

#[tokio::test]
async fn scenario_late_arriving_lower_stage_is_rejected() {
    let store = Arc::new(InMemoryStore::from_snapshot(
        vec![Unit::new("U1", at(7, 0)).with_barcode("B-1")],
        vec![
            ScanEvent::new("s1", "3@B-1", "3", at(9, 0)),
            ScanEvent::new("s2", "1@B-1", "1", at(9, 30)),
        ],
    ));
    let out = SyncPass::new(store.clone(), store.clone())
        .run(&UnitFilter::all())
        .await
        .unwrap();

    // Latest status-bearing event is the 09:30 Cut; from Scheduled that
    // is forward.
    assert_eq!(store.unit("U1").await.unwrap().status, LifecycleStatus::Cut);
    assert_eq!(out.applied, 1);

    // Someone moves it on to Stored; the 09:30 Cut is now a regression.
    store
        .update_unit_status("U1", LifecycleStatus::Stored, at(11, 0), false)
        .await
        .unwrap();
    let out = SyncPass::new(store.clone(), store.clone())
        .run(&UnitFilter::all())
        .await
        .unwrap();
    assert_eq!(out.applied, 0);
    assert_eq!(
        out.report
            .diagnostics_of(DiagnosticKind::StatusRegressionRejected)
            .count(),
        1
    );
    assert_eq!(store.unit("U1").await.unwrap().status, LifecycleStatus::Stored);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_concurrent_passes_apply_each_change_once() {
    let units: Vec<Unit> = (0..20)
        .map(|i| Unit::new(format!("U{i:02}"), at(7, 0)).with_barcode(format!("B-{i:02}")))
        .collect();
    let scans: Vec<ScanEvent> = (0..20)
        .map(|i| ScanEvent::new(format!("s{i:02}"), format!("2@B-{i:02}"), "2", at(9, i)))
        .collect();
    let store = Arc::new(InMemoryStore::from_snapshot(units, scans));
    let locks = Arc::new(BarcodeLocks::new());

    let mk = || {
        SyncPass::new(store.clone(), store.clone()).with_locks(locks.clone())
    };
    let (a, b, c) = tokio::join!(
        async { mk().run(&UnitFilter::all()).await },
        async { mk().run(&UnitFilter::all()).await },
        async { mk().run(&UnitFilter::all()).await },
    );
    let applied = a.unwrap().applied + b.unwrap().applied + c.unwrap().applied;

    assert_eq!(applied, 20);
    for u in store.units().await {
        assert_eq!(u.status, LifecycleStatus::CornerCleaned);
    }
    assert_eq!(locks.len().await, 0, "finished passes leave no lock slots behind");
}

#[tokio::test]
async fn scenario_lock_table_stays_empty_between_passes() {
    let units: Vec<Unit> = (0..5)
        .map(|i| Unit::new(format!("U{i}"), at(7, 0)).with_barcode(format!("B-{i}")))
        .collect();
    let scans: Vec<ScanEvent> = (0..5)
        .map(|i| ScanEvent::new(format!("s{i}"), format!("1@B-{i}"), "1", at(8, i)))
        .collect();
    let store = Arc::new(InMemoryStore::from_snapshot(units, scans));
    let locks = Arc::new(BarcodeLocks::new());
    let pass = SyncPass::new(store.clone(), store.clone()).with_locks(locks.clone());

    let first = pass.run(&UnitFilter::all()).await.unwrap();
    assert_eq!(first.applied, 5);
    assert_eq!(locks.len().await, 0);

    store
        .append_scan_event("2@B-0", "2", at(9, 0), None, false)
        .await
        .unwrap();
    let second = pass.run(&UnitFilter::all()).await.unwrap();
    assert_eq!(second.applied, 1);
    assert_eq!(locks.len().await, 0);
}

#[tokio::test]
async fn scenario_write_racing_a_newer_status_is_stale() {
    let store = Arc::new(InMemoryStore::from_snapshot(
        vec![Unit::new("U1", at(7, 0)).with_barcode("B-1")],
        vec![ScanEvent::new("s1", "2@B-1", "2", at(9, 0))],
    ));
    let pass = SyncPass::new(store.clone(), store.clone());

    // Pass resolved its snapshot; a newer write lands before it writes back.
    let (_, report) = pass.preview(&UnitFilter::all()).await.unwrap();
    let v = report.view("U1").unwrap();
    store
        .update_unit_status("U1", LifecycleStatus::Cut, at(9, 30), true)
        .await
        .unwrap();
    let decision = store
        .update_unit_status("U1", v.status, v.status_timestamp, v.manual_override)
        .await
        .unwrap();

    assert!(matches!(
        decision,
        pt_reconcile::writeback::WriteDecision::Stale { .. }
    ));
    assert_eq!(store.unit("U1").await.unwrap().status, LifecycleStatus::Cut);
}
