//! pt-reconcile
//!
//! Status reconciliation between order records and scan-station events.
//!
//! - Raw scan identifiers are normalised by the barcode matcher before
//!   anything else sees them; malformed ones never reach grouping.
//! - Scans are grouped per canonical barcode into a pure intermediate map.
//! - Latest status-bearing event per barcode is the candidate; ties on time
//!   break on event id.
//! - Backward candidates are discarded unless they are manual overrides.
//! - Barcodes with no unit become virtual scan-only units.
//!
//! Deterministic, pure logic. No IO. No clock.

mod engine;
mod grouping;
mod matcher;
mod projector;
mod types;
pub mod writeback;

pub use engine::{reconcile, reconcile_with};
pub use grouping::{group_scans, GroupedScans, MatchedScan, ScanGroup};
pub use matcher::{
    match_barcode, BarcodeMatch, DeviceStageTable, MatchError, DEVICE_SEPARATOR,
};
pub use projector::{project_unmatched, virtual_unit_id, VIRTUAL_ID_PREFIX};
pub use types::*;
