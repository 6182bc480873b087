//! Time utilities for chime
//!
//! Deadlines are absolute wall-clock points expressed in whole
//! milliseconds since the Unix epoch. All arithmetic saturates: a
//! deadline can never underflow past the epoch or overflow `u64`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ChimeError;

/// An absolute point in time, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpochMillis(u64);

impl EpochMillis {
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(clamped_millis(duration)))
    }

    pub fn saturating_add_millis(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Milliseconds from `from` until `self`, or zero if `self` is in the past.
    pub fn saturating_millis_until(self, from: EpochMillis) -> u64 {
        self.0.saturating_sub(from.0)
    }

    /// Duration from `from` until `self`, or zero if `self` is in the past.
    pub fn saturating_duration_until(self, from: EpochMillis) -> Duration {
        Duration::from_millis(self.saturating_millis_until(from))
    }

    /// Wall-clock rendering for display and logging.
    pub fn to_datetime(self) -> DateTime<Utc> {
        let ms = self.0.min(i64::MAX as u64) as i64;
        match Utc.timestamp_millis_opt(ms) {
            chrono::LocalResult::Single(dt) => dt,
            _ => DateTime::<Utc>::MAX_UTC,
        }
    }
}

impl From<DateTime<Utc>> for EpochMillis {
    /// Pre-epoch datetimes clamp to the epoch.
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis().max(0) as u64)
    }
}

impl std::ops::Add<Duration> for EpochMillis {
    type Output = EpochMillis;

    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl std::fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Whole milliseconds in `d`, clamped to `u64`.
pub fn clamped_millis(d: Duration) -> u64 {
    d.as_millis().min(u64::MAX as u128) as u64
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else if seconds > 0 {
        format!("{}s", seconds)
    } else {
        format!("{}ms", d.subsec_millis())
    }
}

/// Parse a human-entered duration such as `250ms`, `90s`, `1h30m` or `2d`.
///
/// A bare number is taken as milliseconds. Segments may be concatenated
/// and are summed.
pub fn parse_duration(input: &str) -> crate::Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ChimeError::invalid_duration("empty duration"));
    }

    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ChimeError::invalid_duration(format!("missing unit in {input:?}")))?;
        if digits_end == 0 {
            return Err(ChimeError::invalid_duration(format!(
                "expected a number in {input:?}"
            )));
        }
        let value: u64 = rest[..digits_end]
            .parse()
            .map_err(|_| ChimeError::invalid_duration(format!("bad number in {input:?}")))?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let segment = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(3600)),
            "d" => Duration::from_secs(value.saturating_mul(86400)),
            other => {
                return Err(ChimeError::invalid_duration(format!(
                    "unknown unit {other:?} in {input:?}"
                )));
            }
        };
        total = total.saturating_add(segment);
    }

    Ok(total)
}
