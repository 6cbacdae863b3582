//! pt-aggregate
//!
//! Dashboard counts over resolved views.
//!
//! - Half-open `[start, end)` windows, either bound optional.
//! - A unit is in a window if it was created OR changed status inside it.
//! - "Today" is derived from the caller's `now` and an explicit day
//!   boundary; the engine never reads the wall clock and never assumes a
//!   time zone.
//! - Every status bucket is always present so callers get a stable shape.
//!
//! Pure deterministic logic. No IO.

mod day;
mod engine;
mod window;

pub use day::{DayBoundary, ParseDayBoundaryError};
pub use engine::{aggregate, group_by_status, Aggregate, Aggregator};
pub use window::TimeWindow;
