//! Barcode matcher: device-prefix stripping and device → stage mapping.
//!
//! The stage table is data, not control flow. Stations that are not in the
//! table still produce a match (the scan is kept for history) but carry no
//! inferred status.

use std::collections::BTreeMap;
use std::fmt;

use pt_lifecycle::LifecycleStatus;
use serde::{Deserialize, Serialize};

/// Separates the device tag from the barcode in a raw scan identifier.
pub const DEVICE_SEPARATOR: char = '@';

// ---------------------------------------------------------------------------
// Device table
// ---------------------------------------------------------------------------

/// Which production stage each scan station reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStageTable {
    stages: BTreeMap<String, LifecycleStatus>,
}

impl Default for DeviceStageTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl DeviceStageTable {
    /// Shop-floor layout: saw line, corner cleaner, warehouse intake.
    pub fn standard() -> Self {
        Self::empty()
            .with_stage("1", LifecycleStatus::Cut)
            .with_stage("2", LifecycleStatus::CornerCleaned)
            .with_stage("3", LifecycleStatus::Stored)
    }

    pub fn empty() -> Self {
        Self {
            stages: BTreeMap::new(),
        }
    }

    pub fn with_stage(mut self, device_id: impl Into<String>, status: LifecycleStatus) -> Self {
        self.insert(device_id, status);
        self
    }

    pub fn insert(&mut self, device_id: impl Into<String>, status: LifecycleStatus) {
        let id: String = device_id.into();
        self.stages.insert(id.trim().to_string(), status);
    }

    pub fn stage_for(&self, device_id: &str) -> Option<LifecycleStatus> {
        self.stages.get(device_id.trim()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, LifecycleStatus)> {
        self.stages.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Normalise one raw scan against this table.
    ///
    /// `device_id` is the station the event was received from. When it is
    /// blank the tag embedded in the raw identifier is used instead.
    pub fn match_barcode(
        &self,
        raw_identifier: &str,
        device_id: &str,
    ) -> Result<BarcodeMatch, MatchError> {
        let (device_tag, barcode) = split_prefix(raw_identifier);

        if barcode.is_empty() {
            return Err(MatchError::InvalidBarcodeFormat {
                raw_identifier: raw_identifier.to_string(),
            });
        }

        let lookup = match device_id.trim() {
            "" => device_tag.unwrap_or(""),
            d => d,
        };
        let inferred_status = self.stage_for(lookup);

        Ok(BarcodeMatch {
            canonical_barcode: barcode.to_string(),
            device_tag: device_tag.map(str::to_string),
            inferred_status,
            unknown_device: inferred_status.is_none(),
        })
    }
}

/// Split `"<tag>@<barcode>"` on the first separator.
fn split_prefix(raw: &str) -> (Option<&str>, &str) {
    let raw = raw.trim();
    match raw.split_once(DEVICE_SEPARATOR) {
        Some((tag, rest)) => (Some(tag.trim()), rest.trim()),
        None => (None, raw),
    }
}

// ---------------------------------------------------------------------------
// Match result
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeMatch {
    pub canonical_barcode: String,
    /// Tag found before the separator, if any.
    pub device_tag: Option<String>,
    /// Stage reported by the station. `None` for unmapped stations.
    pub inferred_status: Option<LifecycleStatus>,
    pub unknown_device: bool,
}

/// Errors that reject a scan at the boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchError {
    /// Nothing left after stripping the device prefix.
    InvalidBarcodeFormat { raw_identifier: String },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::InvalidBarcodeFormat { raw_identifier } => write!(
                f,
                "invalid barcode format: '{raw_identifier}' has an empty barcode after prefix stripping"
            ),
        }
    }
}

impl std::error::Error for MatchError {}

/// [`DeviceStageTable::match_barcode`] against the standard station layout.
pub fn match_barcode(raw_identifier: &str, device_id: &str) -> Result<BarcodeMatch, MatchError> {
    DeviceStageTable::standard().match_barcode(raw_identifier, device_id)
}
