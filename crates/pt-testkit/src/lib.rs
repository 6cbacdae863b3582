//! pt-testkit
//!
//! Fixture builders and snapshot loading shared by scenario tests.
//!
//! All fixture times fall on one reference shift day, 2024-05-06 (UTC),
//! unless a test asks for another day explicitly.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use pt_lifecycle::LifecycleStatus;
use pt_schemas::{ScanEvent, Unit};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// `hh:mm` on the reference day.
pub fn ts(h: u32, m: u32) -> DateTime<Utc> {
    ts_on(6, h, m)
}

/// `hh:mm` on day `d` of May 2024.
pub fn ts_on(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2024, 5, d, h, m, 0) {
        chrono::LocalResult::Single(t) => t,
        _ => panic!("fixture time out of range: 2024-05-{d:02} {h:02}:{m:02}"),
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Order entered at 07:00 on the reference day.
pub fn unit(id: &str, barcode: &str) -> Unit {
    Unit::new(id, ts(7, 0)).with_barcode(barcode)
}

/// Order already moved to `status` at `at`.
pub fn unit_at(id: &str, barcode: &str, status: LifecycleStatus, at: DateTime<Utc>) -> Unit {
    unit(id, barcode).with_status(status, at)
}

/// Station scan with the station id used both as prefix and device.
pub fn scan(id: &str, device: &str, barcode: &str, at: DateTime<Utc>) -> ScanEvent {
    ScanEvent::new(id, format!("{device}@{barcode}"), device, at)
}

/// Manual correction from the office desk.
pub fn override_scan(id: &str, barcode: &str, status: LifecycleStatus, at: DateTime<Utc>) -> ScanEvent {
    ScanEvent::new(id, barcode, "desk", at).as_override(status)
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Units and scans as exported from the shop-floor system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub scans: Vec<ScanEvent>,
}

pub fn load_snapshot_json(path: impl AsRef<Path>) -> Result<Snapshot> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).with_context(|| format!("read snapshot: {path:?}"))?;
    serde_json::from_str(&s).with_context(|| format!("parse snapshot json: {path:?}"))
}

/// Bundled fixture under `crates/pt-testkit/fixtures/`.
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

/// Split a snapshot into the `units.json` / `scans.json` pair the CLI reads.
pub fn write_snapshot_files(dir: impl AsRef<Path>, snap: &Snapshot) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("create_dir_all {dir:?}"))?;
    let units = dir.join("units.json");
    let scans = dir.join("scans.json");
    fs::write(&units, serde_json::to_string_pretty(&snap.units)?)
        .with_context(|| format!("write {units:?}"))?;
    fs::write(&scans, serde_json::to_string_pretty(&snap.scans)?)
        .with_context(|| format!("write {scans:?}"))?;
    Ok((units, scans))
}
