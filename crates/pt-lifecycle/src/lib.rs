//! pt-lifecycle
//!
//! Production lifecycle model for a fabricated unit.
//!
//! - Closed status enumeration with an explicit rank.
//! - Scan-only pseudo-status `Scanned` has no rank and never compares
//!   against ranked statuses.
//! - Presentation labels are layered on top of the machine codes.
//!
//! Every other crate asks this one about ordering. Nobody re-encodes it.
//!
//! Pure deterministic logic. No IO.

mod grouped;
mod status;
mod transition;

pub use grouped::{status_map, StatusGrouped};
pub use status::{LifecycleStatus, ParseStatusError};
pub use transition::{classify_transition, is_forward_transition, rank, Transition};
