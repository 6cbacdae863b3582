//! Day boundary for "today" counts.
//!
//! # Policy
//!
//! The caller injects `now`. Which calendar day that instant belongs to is
//! decided by an explicit [`DayBoundary`]: UTC (default), a fixed offset, or
//! an IANA zone. The boundary comes from configuration; it is never guessed
//! here, and one policy is used for every count in a pass.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, FixedOffset, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::TimeWindow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayBoundary {
    /// Days run 00:00–24:00 UTC.
    Utc,
    /// Fixed offset from UTC, no daylight saving.
    Fixed(FixedOffset),
    /// IANA zone, daylight saving honoured.
    Zone(Tz),
}

impl Default for DayBoundary {
    fn default() -> Self {
        DayBoundary::Utc
    }
}

impl DayBoundary {
    pub fn fixed_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours.checked_mul(3600)?).map(DayBoundary::Fixed)
    }

    /// The calendar day containing `now`, as a UTC window.
    pub fn day_window(&self, now: DateTime<Utc>) -> TimeWindow {
        match self {
            DayBoundary::Utc => day_window_in(&Utc, now),
            DayBoundary::Fixed(off) => day_window_in(off, now),
            DayBoundary::Zone(tz) => day_window_in(tz, now),
        }
    }
}

fn day_window_in<Z: TimeZone>(zone: &Z, now: DateTime<Utc>) -> TimeWindow {
    let date = now.with_timezone(zone).date_naive();
    TimeWindow {
        start: Some(local_midnight_utc(zone, date)),
        end: date
            .checked_add_days(Days::new(1))
            .map(|next| local_midnight_utc(zone, next)),
    }
}

/// First instant of `date` in `zone`, in UTC.
///
/// Zones that skip midnight (DST switch at 00:00) start the day at the first
/// valid local time after it.
fn local_midnight_utc<Z: TimeZone>(zone: &Z, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::default());
    for hour in 0..=3 {
        let local = midnight + chrono::Duration::hours(hour);
        match zone.from_local_datetime(&local) {
            LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => {
                return t.with_timezone(&Utc)
            }
            LocalResult::None => continue,
        }
    }
    midnight.and_utc()
}

impl fmt::Display for DayBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayBoundary::Utc => f.write_str("UTC"),
            DayBoundary::Fixed(off) => write!(f, "{off}"),
            DayBoundary::Zone(tz) => f.write_str(tz.name()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseDayBoundaryError {
    pub raw: String,
    pub reason: String,
}

impl fmt::Display for ParseDayBoundaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid day boundary '{}': {}", self.raw, self.reason)
    }
}

impl std::error::Error for ParseDayBoundaryError {}

impl FromStr for DayBoundary {
    type Err = ParseDayBoundaryError;

    /// `"UTC"`, a signed offset (`"+08:00"`, `"-5"`), or an IANA zone name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let err = |reason: String| ParseDayBoundaryError {
            raw: s.to_string(),
            reason,
        };

        if t.eq_ignore_ascii_case("utc") || t == "Z" {
            return Ok(DayBoundary::Utc);
        }

        if t.starts_with('+') || t.starts_with('-') {
            let secs = parse_offset_secs(t).ok_or_else(|| err("malformed offset".into()))?;
            return FixedOffset::east_opt(secs)
                .map(DayBoundary::Fixed)
                .ok_or_else(|| err("offset out of range".into()));
        }

        t.parse::<Tz>()
            .map(DayBoundary::Zone)
            .map_err(|e| err(format!("{e}")))
    }
}

/// `+HH`, `+HH:MM` or `+HHMM`, either sign.
fn parse_offset_secs(t: &str) -> Option<i32> {
    let (sign, rest) = match t.split_at(1) {
        ("+", r) => (1, r),
        ("-", r) => (-1, r),
        _ => return None,
    };
    let (h, m) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let h: i32 = h.parse().ok()?;
    let m: i32 = m.parse().ok()?;
    if !(0..60).contains(&m) {
        return None;
    }
    h.checked_mul(3600)?.checked_add(m * 60)?.checked_mul(sign)
}
