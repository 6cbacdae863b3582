//! Unmatched-scan projector.
//!
//! A barcode that no unit owns still shows up in aggregates and operator
//! queues as a virtual, read-only unit. Callers get one shape for both kinds
//! and tell them apart by `is_virtual`.

use pt_lifecycle::{is_forward_transition, LifecycleStatus};

use crate::{ReconcileDiagnostic, ResolvedView, ScanGroup};

/// Namespace for virtual unit ids; real unit ids never carry it.
pub const VIRTUAL_ID_PREFIX: &str = "scan_";

pub fn virtual_unit_id(scan_id: &str) -> String {
    format!("{VIRTUAL_ID_PREFIX}{scan_id}")
}

/// Synthesize the virtual unit for `barcode`.
///
/// Keyed by the group's earliest event. The status is folded through the
/// group in time order starting from `Scanned`: the first status-bearing
/// event sets it, later ones must move forward or be manual overrides.
/// Returns `None` for an empty group.
pub fn project_unmatched(
    barcode: &str,
    group: &ScanGroup,
    diagnostics: &mut Vec<ReconcileDiagnostic>,
) -> Option<ResolvedView> {
    let earliest = group.earliest()?;
    let latest = group.latest()?;
    let unit_id = virtual_unit_id(&earliest.scan_id);

    let mut status = LifecycleStatus::Scanned;
    let mut status_timestamp = earliest.occurred_at;
    let mut source_scan_id = earliest.scan_id.clone();
    let mut manual_override = false;
    let mut has_stage = false;

    for ev in group.events() {
        let Some(candidate) = ev.status else {
            continue;
        };
        if !has_stage || is_forward_transition(status, candidate, ev.manual_override) {
            status = candidate;
            status_timestamp = ev.occurred_at;
            source_scan_id = ev.scan_id.clone();
            manual_override = ev.manual_override;
            has_stage = true;
        } else {
            diagnostics.push(ReconcileDiagnostic::StatusRegressionRejected {
                unit_id: unit_id.clone(),
                barcode: barcode.to_string(),
                scan_id: ev.scan_id.clone(),
                current: status,
                candidate,
            });
        }
    }

    Some(ResolvedView {
        unit_id,
        barcode: Some(barcode.to_string()),
        status,
        status_timestamp,
        source_scan_id: Some(source_scan_id),
        created_at: earliest.occurred_at,
        last_scanned_at: Some(latest.occurred_at),
        is_virtual: true,
        manual_override,
        changed: false,
    })
}
