//! Observable timer state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a timer instance.
///
/// Derived from the internal {completed, paused-remaining} pair rather
/// than tracked separately. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Armed; a wake-up is scheduled with the driver.
    Waiting,
    /// Countdown suspended; the remaining duration is captured.
    Paused,
    /// Fired or cleared. No further transitions.
    Completed,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerState::Waiting => "waiting",
            TimerState::Paused => "paused",
            TimerState::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}
