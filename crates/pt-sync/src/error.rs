use std::fmt;

use pt_reconcile::MatchError;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors a [`crate::UnitStore`] / [`crate::ScanStore`] backend may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UnitNotFound { unit_id: String },
    /// Backend failure (connection, query, decode).
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UnitNotFound { unit_id } => write!(f, "unit not found: {unit_id}"),
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// SyncError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SyncError {
    Store(StoreError),
    /// Scan refused before append.
    InvalidScan(MatchError),
    /// Manual override entered without a status to override to.
    OverrideWithoutStatus { raw_identifier: String },
    Audit(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Store(e) => write!(f, "{e}"),
            SyncError::InvalidScan(e) => write!(f, "scan rejected: {e}"),
            SyncError::OverrideWithoutStatus { raw_identifier } => {
                write!(f, "manual override without status: {raw_identifier}")
            }
            SyncError::Audit(msg) => write!(f, "audit write failed: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Store(e) => Some(e),
            SyncError::InvalidScan(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        SyncError::Store(e)
    }
}

impl From<MatchError> for SyncError {
    fn from(e: MatchError) -> Self {
        SyncError::InvalidScan(e)
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(e: anyhow::Error) -> Self {
        SyncError::Audit(format!("{e:#}"))
    }
}
