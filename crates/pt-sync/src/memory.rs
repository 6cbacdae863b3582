//! In-process store backing tests and the CLI.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pt_lifecycle::LifecycleStatus;
use pt_reconcile::writeback::{check_write, StoredStatus, WriteDecision};
use pt_schemas::{ScanEvent, Unit};
use tokio::sync::RwLock;

use crate::{ScanFilter, ScanStore, StoreError, UnitFilter, UnitStore};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    units: RwLock<BTreeMap<String, Unit>>,
    scans: RwLock<Vec<ScanEvent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from snapshots. A later unit with a repeated id replaces the
    /// earlier one.
    pub fn from_snapshot(units: Vec<Unit>, scans: Vec<ScanEvent>) -> Self {
        Self {
            units: RwLock::new(units.into_iter().map(|u| (u.id.clone(), u)).collect()),
            scans: RwLock::new(scans),
        }
    }

    pub async fn insert_unit(&self, unit: Unit) {
        self.units.write().await.insert(unit.id.clone(), unit);
    }

    pub async fn unit(&self, unit_id: &str) -> Option<Unit> {
        self.units.read().await.get(unit_id).cloned()
    }

    /// Units in id order.
    pub async fn units(&self) -> Vec<Unit> {
        self.units.read().await.values().cloned().collect()
    }

    /// Scans in append order.
    pub async fn scans(&self) -> Vec<ScanEvent> {
        self.scans.read().await.clone()
    }
}

/// Zero-padded so lexicographic order follows append order.
fn scan_id(seq: usize) -> String {
    format!("S{seq:08}")
}

/// What the guard compares against. A unit that never had a status applied
/// has no recency to protect.
fn stored_status(unit: &Unit) -> StoredStatus {
    StoredStatus {
        status: unit.status,
        status_timestamp: unit.status_updated_at.unwrap_or(DateTime::<Utc>::MIN_UTC),
    }
}

#[async_trait::async_trait]
impl UnitStore for InMemoryStore {
    async fn list_units(&self, filter: &UnitFilter) -> Result<Vec<Unit>, StoreError> {
        let units = self.units.read().await;
        Ok(units.values().filter(|u| filter.matches(u)).cloned().collect())
    }

    async fn update_unit_status(
        &self,
        unit_id: &str,
        status: LifecycleStatus,
        status_timestamp: DateTime<Utc>,
        manual_override: bool,
    ) -> Result<WriteDecision, StoreError> {
        let mut units = self.units.write().await;
        let unit = units.get_mut(unit_id).ok_or_else(|| StoreError::UnitNotFound {
            unit_id: unit_id.to_string(),
        })?;

        let decision = check_write(&stored_status(unit), status, status_timestamp, manual_override);
        if decision.is_apply() {
            unit.status = status;
            unit.status_updated_at = Some(status_timestamp);
        }
        Ok(decision)
    }

    async fn touch_last_scanned(
        &self,
        unit_id: &str,
        scanned_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut units = self.units.write().await;
        let unit = units.get_mut(unit_id).ok_or_else(|| StoreError::UnitNotFound {
            unit_id: unit_id.to_string(),
        })?;
        if unit.last_scanned_at.map_or(true, |prev| scanned_at > prev) {
            unit.last_scanned_at = Some(scanned_at);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ScanStore for InMemoryStore {
    async fn list_scan_events(&self, filter: &ScanFilter) -> Result<Vec<ScanEvent>, StoreError> {
        let scans = self.scans.read().await;
        Ok(scans.iter().filter(|s| filter.matches(s)).cloned().collect())
    }

    async fn append_scan_event(
        &self,
        raw_identifier: &str,
        device_id: &str,
        occurred_at: DateTime<Utc>,
        explicit_status: Option<LifecycleStatus>,
        manual_override: bool,
    ) -> Result<ScanEvent, StoreError> {
        let mut scans = self.scans.write().await;
        let ev = ScanEvent {
            id: scan_id(scans.len() + 1),
            raw_identifier: raw_identifier.to_string(),
            device_id: device_id.to_string(),
            occurred_at,
            explicit_status,
            manual_override,
        };
        scans.push(ev.clone());
        Ok(ev)
    }
}
