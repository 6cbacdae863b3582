use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use pt_lifecycle::is_forward_transition;
use pt_schemas::{ScanEvent, Unit};

use crate::grouping::{group_scans, ScanGroup};
use crate::projector::project_unmatched;
use crate::{DeviceStageTable, ReconcileDiagnostic, ReconcileReport, ResolvedView};

/// Resolve one real unit against the scans that name its barcode.
fn resolve_unit(
    unit: &Unit,
    group: Option<&ScanGroup>,
    diagnostics: &mut Vec<ReconcileDiagnostic>,
) -> ResolvedView {
    let mut view = ResolvedView::from_stored(unit);
    let Some(group) = group else {
        return view;
    };

    // Any newer scan advances last_scanned_at, accepted or not.
    if let Some(latest) = group.latest() {
        if view.last_scanned_at.map_or(true, |t| latest.occurred_at > t) {
            view.last_scanned_at = Some(latest.occurred_at);
        }
    }

    if let Some(cand) = group.latest_with_status() {
        // latest_with_status only yields events with a status
        if let Some(candidate) = cand.status {
            // A status applied after the candidate happened is newer
            // information; the store would refuse the write as stale.
            let superseded = unit
                .status_updated_at
                .is_some_and(|applied| cand.occurred_at < applied);

            if !is_forward_transition(unit.status, candidate, cand.manual_override) {
                diagnostics.push(ReconcileDiagnostic::StatusRegressionRejected {
                    unit_id: unit.id.clone(),
                    barcode: view.barcode.clone().unwrap_or_default(),
                    scan_id: cand.scan_id.clone(),
                    current: unit.status,
                    candidate,
                });
            } else if !superseded {
                view.status = candidate;
                view.status_timestamp = cand.occurred_at;
                view.source_scan_id = Some(cand.scan_id.clone());
                view.manual_override = cand.manual_override;
            }
        }
    }

    view.changed = view.status != unit.status
        || view.status_timestamp != unit.stored_status_timestamp()
        || view.last_scanned_at != unit.last_scanned_at;
    view
}

/// Reconcile against the standard station layout.
pub fn reconcile(units: &[Unit], scans: &[ScanEvent]) -> ReconcileReport {
    reconcile_with(units, scans, &DeviceStageTable::standard())
}

/// Deterministic reconciliation:
/// - every unit gets exactly one view; scans can only move it forward
///   unless they are manual overrides
/// - barcodes no unit owns become virtual units
/// - input order of `units` and `scans` does not affect the output
pub fn reconcile_with(
    units: &[Unit],
    scans: &[ScanEvent],
    table: &DeviceStageTable,
) -> ReconcileReport {
    let grouped = group_scans(scans, table);
    let mut diagnostics = grouped.diagnostics.clone();

    // 1) Barcode ownership, lowest unit id wins.
    let mut ordered_units: Vec<&Unit> = units.iter().collect();
    ordered_units.sort_by(|a, b| a.id.cmp(&b.id));

    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    for unit in &ordered_units {
        let Some(barcode) = unit.barcode_key() else {
            continue;
        };
        match owners.entry(barcode) {
            Entry::Vacant(e) => {
                e.insert(unit.id.as_str());
            }
            Entry::Occupied(e) => diagnostics.push(ReconcileDiagnostic::DuplicateUnitBarcode {
                barcode: barcode.to_string(),
                kept_unit_id: e.get().to_string(),
                ignored_unit_id: unit.id.clone(),
            }),
        }
    }

    // 2) Real units.
    let mut views: Vec<ResolvedView> = Vec::with_capacity(ordered_units.len());
    for unit in &ordered_units {
        let group = unit
            .barcode_key()
            .filter(|b| owners.get(b) == Some(&unit.id.as_str()))
            .and_then(|b| grouped.get(b));
        views.push(resolve_unit(unit, group, &mut diagnostics));
    }

    // 3) Barcodes nobody owns.
    let mut virtuals: Vec<ResolvedView> = grouped
        .groups
        .iter()
        .filter(|(barcode, _)| !owners.contains_key(barcode.as_str()))
        .filter_map(|(barcode, group)| project_unmatched(barcode, group, &mut diagnostics))
        .collect();
    virtuals.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));
    views.extend(virtuals);

    // Stable ordering for diagnostics (deterministic output).
    diagnostics.sort();
    diagnostics.dedup();

    ReconcileReport { views, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pt_lifecycle::LifecycleStatus;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
    }

    #[test]
    fn forward_scan_advances_status() {
        let units = vec![Unit::new("U1", at(7, 0)).with_barcode("B1")];
        let scans = vec![ScanEvent::new("s1", "1@B1", "1", at(8, 0))];
        let r = reconcile(&units, &scans);
        let v = r.view("U1").unwrap();
        assert_eq!(v.status, LifecycleStatus::Cut);
        assert_eq!(v.status_timestamp, at(8, 0));
        assert_eq!(v.source_scan_id.as_deref(), Some("s1"));
        assert!(v.changed);
        assert!(!r.has_diagnostics());
    }

    #[test]
    fn unit_without_scans_keeps_stored_state() {
        let units = vec![Unit::new("U1", at(7, 0)).with_status(LifecycleStatus::Cut, at(7, 30))];
        let r = reconcile(&units, &[]);
        let v = r.view("U1").unwrap();
        assert_eq!(v.status, LifecycleStatus::Cut);
        assert_eq!(v.status_timestamp, at(7, 30));
        assert!(!v.changed);
    }

    #[test]
    fn backward_override_is_accepted() {
        let units = vec![Unit::new("U1", at(7, 0))
            .with_barcode("B1")
            .with_status(LifecycleStatus::Shipped, at(8, 0))];
        let scans = vec![ScanEvent::new("fix-1", "B1", "manual", at(9, 0))
            .as_override(LifecycleStatus::Stored)];
        let r = reconcile(&units, &scans);
        let v = r.view("U1").unwrap();
        assert_eq!(v.status, LifecycleStatus::Stored);
        assert!(v.manual_override);
        assert!(!r.has_diagnostics());
    }

    #[test]
    fn unknown_station_only_touches_last_scanned() {
        let units = vec![Unit::new("U1", at(7, 0))
            .with_barcode("B1")
            .with_status(LifecycleStatus::Cut, at(8, 0))];
        let scans = vec![ScanEvent::new("s9", "9@B1", "9", at(9, 0))];
        let r = reconcile(&units, &scans);
        let v = r.view("U1").unwrap();
        assert_eq!(v.status, LifecycleStatus::Cut);
        assert_eq!(v.status_timestamp, at(8, 0));
        assert_eq!(v.last_scanned_at, Some(at(9, 0)));
        assert!(v.changed);
        assert_eq!(r.diagnostics.len(), 1);
    }

    #[test]
    fn duplicate_barcode_goes_to_lowest_id() {
        let units = vec![
            Unit::new("U2", at(7, 0)).with_barcode("B1"),
            Unit::new("U1", at(7, 0)).with_barcode("B1"),
        ];
        let scans = vec![ScanEvent::new("s1", "B1", "1", at(8, 0))];
        let r = reconcile(&units, &scans);
        assert_eq!(r.view("U1").unwrap().status, LifecycleStatus::Cut);
        assert_eq!(r.view("U2").unwrap().status, LifecycleStatus::Scheduled);
        assert_eq!(
            r.diagnostics,
            vec![ReconcileDiagnostic::DuplicateUnitBarcode {
                barcode: "B1".into(),
                kept_unit_id: "U1".into(),
                ignored_unit_id: "U2".into(),
            }]
        );
    }

    #[test]
    fn views_are_real_then_virtual() {
        let units = vec![Unit::new("U1", at(7, 0)).with_barcode("B1")];
        let scans = vec![
            ScanEvent::new("s2", "ZZZ", "1", at(8, 0)),
            ScanEvent::new("s1", "B1", "1", at(8, 0)),
        ];
        let r = reconcile(&units, &scans);
        let ids: Vec<&str> = r.views.iter().map(|v| v.unit_id.as_str()).collect();
        assert_eq!(ids, vec!["U1", "scan_s2"]);
    }

    #[test]
    fn scan_older_than_applied_status_is_superseded() {
        // Office moved U1 to Cut at 10:00; a 09:00 Stored scan shows up later.
        let units = vec![Unit::new("U1", at(7, 0))
            .with_barcode("B1")
            .with_status(LifecycleStatus::Cut, at(10, 0))];
        let scans = vec![ScanEvent::new("s1", "3@B1", "3", at(9, 0))];
        let r = reconcile(&units, &scans);
        let v = r.view("U1").unwrap();
        assert_eq!(v.status, LifecycleStatus::Cut);
        assert_eq!(v.status_timestamp, at(10, 0));
        assert_eq!(v.source_scan_id, None);
        assert_eq!(v.last_scanned_at, Some(at(9, 0)));
        assert!(r.diagnostics.is_empty());
    }
}
