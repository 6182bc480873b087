//! Shared deadline-chaining helpers
//!
//! A wait longer than the platform maximum (or long enough to accumulate
//! drift) is split into a chain of wake-ups that each cover half the
//! remaining distance, re-reading the clock at every step. Only once the
//! remainder is within [`ACCURACY_MS`] does the chain commit to a final,
//! unchecked wait.

use chime_driver::MAX_SCHEDULE_DELAY_MS;
use chime_util::EpochMillis;

/// Remaining-time cutoff below which the final wait is scheduled directly.
pub const ACCURACY_MS: u64 = 250;

/// Decision for the next scheduled wake-up of a deadline chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wakeup {
    /// Close enough: wait out the remainder and fire.
    Fire { after_ms: u64 },
    /// Still far out: wait half the remainder, then re-check the clock.
    Rearm { after_ms: u64 },
}

impl Wakeup {
    pub(crate) fn after_ms(self) -> u64 {
        match self {
            Wakeup::Fire { after_ms } | Wakeup::Rearm { after_ms } => after_ms,
        }
    }
}

pub(crate) fn next_wakeup(now: EpochMillis, deadline: EpochMillis) -> Wakeup {
    let remaining = deadline.saturating_millis_until(now);
    if remaining <= ACCURACY_MS {
        Wakeup::Fire {
            after_ms: remaining,
        }
    } else {
        Wakeup::Rearm {
            after_ms: (remaining / 2).min(MAX_SCHEDULE_DELAY_MS),
        }
    }
}
