use chrono::{DateTime, Utc};
use pt_lifecycle::LifecycleStatus;
use pt_reconcile::{BarcodeMatch, DeviceStageTable};
use pt_schemas::ScanEvent;
use tracing::{debug, warn};

use crate::{ScanStore, SyncError};

/// One scan as it arrives from a station or the manual-entry screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewScan {
    pub raw_identifier: String,
    pub device_id: String,
    pub occurred_at: DateTime<Utc>,
    pub explicit_status: Option<LifecycleStatus>,
    pub manual_override: bool,
}

impl NewScan {
    pub fn station(
        raw_identifier: impl Into<String>,
        device_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            raw_identifier: raw_identifier.into(),
            device_id: device_id.into(),
            occurred_at,
            explicit_status: None,
            manual_override: false,
        }
    }

    pub fn manual_override(mut self, status: LifecycleStatus) -> Self {
        self.explicit_status = Some(status);
        self.manual_override = true;
        self
    }
}

/// Validate and append one scan.
///
/// Malformed identifiers never reach the store. Unknown stations are
/// accepted; the scan just carries no inferred stage.
pub async fn record_scan(
    store: &dyn ScanStore,
    table: &DeviceStageTable,
    scan: NewScan,
) -> Result<(ScanEvent, BarcodeMatch), SyncError> {
    let matched = match table.match_barcode(&scan.raw_identifier, &scan.device_id) {
        Ok(m) => m,
        Err(e) => {
            warn!(raw = %scan.raw_identifier, device = %scan.device_id, "scan rejected: {e}");
            return Err(e.into());
        }
    };

    if scan.manual_override && scan.explicit_status.is_none() {
        return Err(SyncError::OverrideWithoutStatus {
            raw_identifier: scan.raw_identifier,
        });
    }

    if matched.unknown_device && scan.explicit_status.is_none() {
        warn!(
            device = %scan.device_id,
            barcode = %matched.canonical_barcode,
            "scan from unmapped station; no stage inferred"
        );
    }

    let ev = store
        .append_scan_event(
            &scan.raw_identifier,
            &scan.device_id,
            scan.occurred_at,
            scan.explicit_status,
            scan.manual_override,
        )
        .await?;

    debug!(scan_id = %ev.id, barcode = %matched.canonical_barcode, "scan recorded");
    Ok((ev, matched))
}
