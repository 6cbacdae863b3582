//! pt-sync
//!
//! Store-facing orchestration around the pure reconciliation engine.
//!
//! - Reads a fresh snapshot of units and scans every pass; nothing is
//!   cached between passes.
//! - Writes back one guarded update per changed unit, serialised per
//!   barcode. The store re-checks rank and recency at write time.
//! - Scans are validated by the barcode matcher before they are appended.
//! - Dashboards are reconcile → aggregate → permission filter.
//!
//! Storage, clock and permission lookup are traits so a real backend can be
//! dropped in; [`InMemoryStore`] backs tests and the CLI.

mod clock;
mod dashboard;
mod error;
mod locks;
mod memory;
mod pass;
mod scan;
mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dashboard::Dashboard;
pub use error::{StoreError, SyncError};
pub use locks::BarcodeLocks;
pub use memory::InMemoryStore;
pub use pass::{SyncOutcome, SyncPass};
pub use scan::{record_scan, NewScan};
pub use store::{PermissionProvider, ScanFilter, ScanStore, UnitFilter, UnitStore};
