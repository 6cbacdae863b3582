use std::sync::Arc;

use pt_lifecycle::LifecycleStatus;
use pt_reconcile::DeviceStageTable;
use pt_sync::{record_scan, FixedClock, InMemoryStore, NewScan, SyncError, SyncPass, UnitFilter};
use pt_testkit::{fixture_path, load_snapshot_json, ts};

fn seeded() -> (Arc<InMemoryStore>, SyncPass) {
    let snap = load_snapshot_json(fixture_path("shop_floor_day.json")).unwrap();
    let store = Arc::new(InMemoryStore::from_snapshot(snap.units, snap.scans));
    let pass = SyncPass::new(store.clone(), store.clone())
        .with_clock(Arc::new(FixedClock(ts(13, 0))));
    (store, pass)
}

#[tokio::test]
async fn station_scans_recorded_mid_shift_land_on_next_pass() {
    let (store, pass) = seeded();
    let table = DeviceStageTable::standard();
    pass.run(&UnitFilter::all()).await.unwrap();

    let (ev, m) = record_scan(store.as_ref(), &table, NewScan::station("3@B-100", "3", ts(12, 0)))
        .await
        .unwrap();
    assert_eq!(m.canonical_barcode, "B-100");
    assert_eq!(m.inferred_status, Some(LifecycleStatus::Stored));
    assert_eq!(ev.raw_identifier, "3@B-100");

    let out = pass.run(&UnitFilter::barcodes(["B-100"])).await.unwrap();
    assert_eq!(out.applied, 1);
    let u1 = store.unit("U1").await.unwrap();
    assert_eq!(u1.status, LifecycleStatus::Stored);
    assert_eq!(u1.status_updated_at, Some(ts(12, 0)));
}

#[tokio::test]
async fn desk_override_moves_a_unit_back() {
    let (store, pass) = seeded();
    let table = DeviceStageTable::standard();
    pass.run(&UnitFilter::all()).await.unwrap();

    let fix = NewScan::station("B-300", "desk", ts(12, 30)).manual_override(LifecycleStatus::Cut);
    record_scan(store.as_ref(), &table, fix).await.unwrap();

    let out = pass.run(&UnitFilter::all()).await.unwrap();
    assert_eq!(out.applied, 1);
    let u3 = store.unit("U3").await.unwrap();
    assert_eq!(u3.status, LifecycleStatus::Cut);
    assert_eq!(u3.status_updated_at, Some(ts(12, 30)));
}

#[tokio::test]
async fn malformed_scan_never_reaches_the_store() {
    let (store, _pass) = seeded();
    let before = store.scans().await.len();

    let err = record_scan(
        store.as_ref(),
        &DeviceStageTable::standard(),
        NewScan::station("2@   ", "2", ts(12, 0)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SyncError::InvalidScan(_)));
    assert_eq!(store.scans().await.len(), before);
}
