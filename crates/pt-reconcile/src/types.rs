use chrono::{DateTime, Utc};
use pt_lifecycle::LifecycleStatus;
use pt_schemas::Unit;
use serde::{Deserialize, Serialize};

/// Resolved status of one unit (real or virtual) for one reconciliation pass.
///
/// Never persisted by the engine; rebuilt from scratch on every pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedView {
    pub unit_id: String,
    pub barcode: Option<String>,
    pub status: LifecycleStatus,
    pub status_timestamp: DateTime<Utc>,
    /// Scan that produced `status`, if a scan did.
    pub source_scan_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    /// Scan-only record with no backing order. Only its status may be
    /// corrected, via a manual-override scan.
    pub is_virtual: bool,
    /// `status` came from a manual override.
    pub manual_override: bool,
    /// Differs from what the unit store currently holds.
    pub changed: bool,
}

impl ResolvedView {
    /// View of a unit exactly as stored, before any scan is applied.
    pub fn from_stored(unit: &Unit) -> Self {
        Self {
            unit_id: unit.id.clone(),
            barcode: unit.barcode_key().map(str::to_string),
            status: unit.status,
            status_timestamp: unit.stored_status_timestamp(),
            source_scan_id: None,
            created_at: unit.created_at,
            last_scanned_at: unit.last_scanned_at,
            is_virtual: false,
            manual_override: false,
            changed: false,
        }
    }
}

/// Coarse diagnostic category, for counting and filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    InvalidBarcodeFormat,
    UnknownDevice,
    DuplicateUnitBarcode,
    StatusRegressionRejected,
}

/// Something the operator may want to audit. None of these abort a batch.
///
/// Stable ordering enforced by the engine.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileDiagnostic {
    /// Scan rejected before grouping: nothing left after prefix stripping.
    InvalidBarcodeFormat {
        scan_id: String,
        raw_identifier: String,
    },
    /// Station not in the stage table; scan kept with no inferred status.
    UnknownDevice { scan_id: String, device_id: String },
    /// Two units claim one barcode; the lowest unit id keeps it.
    DuplicateUnitBarcode {
        barcode: String,
        kept_unit_id: String,
        ignored_unit_id: String,
    },
    /// Backward, non-override candidate discarded.
    StatusRegressionRejected {
        unit_id: String,
        barcode: String,
        scan_id: String,
        current: LifecycleStatus,
        candidate: LifecycleStatus,
    },
}

impl ReconcileDiagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::InvalidBarcodeFormat { .. } => DiagnosticKind::InvalidBarcodeFormat,
            Self::UnknownDevice { .. } => DiagnosticKind::UnknownDevice,
            Self::DuplicateUnitBarcode { .. } => DiagnosticKind::DuplicateUnitBarcode,
            Self::StatusRegressionRejected { .. } => DiagnosticKind::StatusRegressionRejected,
        }
    }
}

/// Output of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Real units in id order, then virtual units in id order.
    pub views: Vec<ResolvedView>,
    pub diagnostics: Vec<ReconcileDiagnostic>,
}

impl ReconcileReport {
    pub fn view(&self, unit_id: &str) -> Option<&ResolvedView> {
        self.views.iter().find(|v| v.unit_id == unit_id)
    }

    pub fn real_views(&self) -> impl Iterator<Item = &ResolvedView> {
        self.views.iter().filter(|v| !v.is_virtual)
    }

    pub fn virtual_views(&self) -> impl Iterator<Item = &ResolvedView> {
        self.views.iter().filter(|v| v.is_virtual)
    }

    /// Real units whose resolved state differs from the store.
    pub fn changed_views(&self) -> impl Iterator<Item = &ResolvedView> {
        self.real_views().filter(|v| v.changed)
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &ReconcileDiagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind() == kind)
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}
