//! pt-view
//!
//! Role-based visibility over status-grouped data.
//!
//! - A role sees a subset of statuses, or all of them.
//! - Filtering removes buckets; it never raises an error and never touches
//!   its input.
//! - Unknown roles see nothing.
//!
//! Pure deterministic logic. No IO.

mod filter;
mod permissions;

pub use filter::{filter_by_permission, filter_json_by_permission};
pub use permissions::{AllowedStatuses, RolePermissions};
