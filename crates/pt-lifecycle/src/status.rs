use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Production stage of a unit.
///
/// Variant order is the canonical production path followed by the scan-only
/// pseudo-status. The derived `Ord` exists so statuses can key a `BTreeMap`
/// with a stable output shape; it is NOT the lifecycle ordering. Use
/// [`crate::rank`] / [`crate::is_forward_transition`] for that.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Scheduled,
    Cut,
    CornerCleaned,
    Stored,
    PartiallyShipped,
    Shipped,
    /// Scan-only record with no backing order. Has no rank.
    Scanned,
}

impl Default for LifecycleStatus {
    fn default() -> Self {
        Self::Scheduled
    }
}

impl LifecycleStatus {
    /// All statuses, ranked path first, `Scanned` last.
    pub const ALL: [LifecycleStatus; 7] = [
        LifecycleStatus::Scheduled,
        LifecycleStatus::Cut,
        LifecycleStatus::CornerCleaned,
        LifecycleStatus::Stored,
        LifecycleStatus::PartiallyShipped,
        LifecycleStatus::Shipped,
        LifecycleStatus::Scanned,
    ];

    /// The ranked production path only.
    pub const RANKED: [LifecycleStatus; 6] = [
        LifecycleStatus::Scheduled,
        LifecycleStatus::Cut,
        LifecycleStatus::CornerCleaned,
        LifecycleStatus::Stored,
        LifecycleStatus::PartiallyShipped,
        LifecycleStatus::Shipped,
    ];

    /// Stable machine code (also the serde representation).
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleStatus::Scheduled => "scheduled",
            LifecycleStatus::Cut => "cut",
            LifecycleStatus::CornerCleaned => "corner_cleaned",
            LifecycleStatus::Stored => "stored",
            LifecycleStatus::PartiallyShipped => "partially_shipped",
            LifecycleStatus::Shipped => "shipped",
            LifecycleStatus::Scanned => "scanned",
        }
    }

    /// Shop-floor label shown to operators.
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleStatus::Scheduled => "已排产",
            LifecycleStatus::Cut => "已切割",
            LifecycleStatus::CornerCleaned => "已清角",
            LifecycleStatus::Stored => "已入库",
            LifecycleStatus::PartiallyShipped => "部分发货",
            LifecycleStatus::Shipped => "已发货",
            LifecycleStatus::Scanned => "已扫描",
        }
    }

    pub fn is_scan_only(&self) -> bool {
        matches!(self, LifecycleStatus::Scanned)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Returned when a string is neither a status code nor a status label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseStatusError {
    pub raw: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised lifecycle status '{}'", self.raw)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for LifecycleStatus {
    type Err = ParseStatusError;

    /// Accepts the machine code (case-insensitive) or the shop-floor label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        LifecycleStatus::ALL
            .iter()
            .copied()
            .find(|st| st.code().eq_ignore_ascii_case(t) || st.label() == t)
            .ok_or_else(|| ParseStatusError { raw: s.to_string() })
    }
}
