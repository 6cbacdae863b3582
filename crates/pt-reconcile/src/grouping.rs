//! Explicit grouping step: raw scans → per-barcode, time-ordered groups.
//!
//! Produces a pure intermediate structure; nothing downstream keeps a
//! "seen barcode" map of its own.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use pt_lifecycle::LifecycleStatus;
use pt_schemas::ScanEvent;

use crate::{DeviceStageTable, MatchError, ReconcileDiagnostic};

/// A scan after matching, reduced to what reconciliation needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedScan {
    pub scan_id: String,
    pub device_id: String,
    pub occurred_at: DateTime<Utc>,
    /// Explicit status if a human chose one, else the station's stage.
    pub status: Option<LifecycleStatus>,
    pub manual_override: bool,
}

impl MatchedScan {
    /// Ordering key: time first, event id breaks ties.
    fn order_key(&self) -> (DateTime<Utc>, &str) {
        (self.occurred_at, self.scan_id.as_str())
    }
}

/// All scans for one canonical barcode, oldest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanGroup {
    events: Vec<MatchedScan>,
}

impl ScanGroup {
    fn new(mut events: Vec<MatchedScan>) -> Self {
        events.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        Self { events }
    }

    /// Chronological, ties ordered by event id.
    pub fn events(&self) -> &[MatchedScan] {
        &self.events
    }

    pub fn earliest(&self) -> Option<&MatchedScan> {
        self.events.first()
    }

    pub fn latest(&self) -> Option<&MatchedScan> {
        self.events.last()
    }

    /// Latest event that carries a status; the reconciliation candidate.
    pub fn latest_with_status(&self) -> Option<&MatchedScan> {
        self.events.iter().rev().find(|e| e.status.is_some())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupedScans {
    pub groups: BTreeMap<String, ScanGroup>,
    /// Malformed scans and unknown stations seen while grouping.
    pub diagnostics: Vec<ReconcileDiagnostic>,
}

impl GroupedScans {
    pub fn get(&self, barcode: &str) -> Option<&ScanGroup> {
        self.groups.get(barcode)
    }
}

/// Match every scan and bucket it by canonical barcode.
///
/// Duplicate deliveries of one event id collapse to a single event. One
/// malformed scan never blocks the rest of the batch.
pub fn group_scans(scans: &[ScanEvent], table: &DeviceStageTable) -> GroupedScans {
    let mut ordered: Vec<&ScanEvent> = scans.iter().collect();
    ordered.sort_by(|a, b| {
        (&a.id, a.occurred_at, &a.raw_identifier, &a.device_id).cmp(&(
            &b.id,
            b.occurred_at,
            &b.raw_identifier,
            &b.device_id,
        ))
    });

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut buckets: BTreeMap<String, Vec<MatchedScan>> = BTreeMap::new();
    let mut diagnostics = Vec::new();

    for scan in ordered {
        if !seen.insert(scan.id.as_str()) {
            continue;
        }

        let m = match table.match_barcode(&scan.raw_identifier, &scan.device_id) {
            Ok(m) => m,
            Err(MatchError::InvalidBarcodeFormat { raw_identifier }) => {
                diagnostics.push(ReconcileDiagnostic::InvalidBarcodeFormat {
                    scan_id: scan.id.clone(),
                    raw_identifier,
                });
                continue;
            }
        };

        // A human-chosen status makes the station irrelevant.
        if m.unknown_device && scan.explicit_status.is_none() {
            diagnostics.push(ReconcileDiagnostic::UnknownDevice {
                scan_id: scan.id.clone(),
                device_id: scan.device_id.clone(),
            });
        }

        buckets
            .entry(m.canonical_barcode)
            .or_default()
            .push(MatchedScan {
                scan_id: scan.id.clone(),
                device_id: scan.device_id.clone(),
                occurred_at: scan.occurred_at,
                status: scan.explicit_status.or(m.inferred_status),
                manual_override: scan.manual_override,
            });
    }

    GroupedScans {
        groups: buckets
            .into_iter()
            .map(|(barcode, events)| (barcode, ScanGroup::new(events)))
            .collect(),
        diagnostics,
    }
}
