//! Boundary records shared by the order-entry and scan-station collaborators.
//!
//! Timestamps are UTC instants and serialize as ISO-8601.

use chrono::{DateTime, Utc};
use pt_lifecycle::LifecycleStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One production record as owned by order entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    /// Customer / order attributes. Opaque to the engine, passed through.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    /// Externally assigned barcode, unique when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default)]
    pub status: LifecycleStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scanned_at: Option<DateTime<Utc>>,
    /// Timestamp of the last applied status change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_updated_at: Option<DateTime<Utc>>,
}

impl Unit {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
            barcode: None,
            status: LifecycleStatus::default(),
            created_at,
            last_scanned_at: None,
            status_updated_at: None,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_status(mut self, status: LifecycleStatus, at: DateTime<Utc>) -> Self {
        self.status = status;
        self.status_updated_at = Some(at);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Barcode if present and non-blank. A blank barcode is "no barcode".
    pub fn barcode_key(&self) -> Option<&str> {
        self.barcode
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }

    /// When the stored status last changed. A scan that moved nothing
    /// (`last_scanned_at` only) does not count.
    pub fn stored_status_timestamp(&self) -> DateTime<Utc> {
        self.status_updated_at.unwrap_or(self.created_at)
    }
}

/// A single scan-station event. Immutable, append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: String,
    /// Possibly prefixed with the device tag: `"<deviceId>@<barcode>"`.
    pub raw_identifier: String,
    pub device_id: String,
    pub occurred_at: DateTime<Utc>,
    /// Status chosen by a human when the scan was entered manually.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_status: Option<LifecycleStatus>,
    /// Manual correction: exempt from the forward-rank check.
    #[serde(default)]
    pub manual_override: bool,
}

impl ScanEvent {
    pub fn new(
        id: impl Into<String>,
        raw_identifier: impl Into<String>,
        device_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            raw_identifier: raw_identifier.into(),
            device_id: device_id.into(),
            occurred_at,
            explicit_status: None,
            manual_override: false,
        }
    }

    pub fn with_explicit_status(mut self, status: LifecycleStatus) -> Self {
        self.explicit_status = Some(status);
        self
    }

    /// Mark as a manual override carrying `status`.
    pub fn as_override(mut self, status: LifecycleStatus) -> Self {
        self.explicit_status = Some(status);
        self.manual_override = true;
        self
    }
}
