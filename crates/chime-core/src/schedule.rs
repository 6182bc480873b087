//! First-fire schedule for a timer

use chime_util::EpochMillis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When a timer should (first) fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// Relative to creation time.
    After(Duration),
    /// At an absolute point in time. Points in the past fire immediately.
    At(EpochMillis),
}

impl Schedule {
    /// Resolve to an absolute deadline against the given clock reading.
    pub fn resolve(self, now: EpochMillis) -> EpochMillis {
        match self {
            Schedule::After(delay) => now.saturating_add(delay),
            Schedule::At(at) => at,
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::After(Duration::ZERO)
    }
}

impl From<Duration> for Schedule {
    fn from(delay: Duration) -> Self {
        Schedule::After(delay)
    }
}

impl From<EpochMillis> for Schedule {
    fn from(at: EpochMillis) -> Self {
        Schedule::At(at)
    }
}

impl From<DateTime<Utc>> for Schedule {
    fn from(at: DateTime<Utc>) -> Self {
        Schedule::At(at.into())
    }
}
