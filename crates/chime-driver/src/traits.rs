//! Timer driver trait

use chime_util::EpochMillis;

use crate::ScheduleHandle;

/// Longest single delay a driver is required to honor, in milliseconds
/// (2^31 - 1, the ceiling of common platform timer APIs).
///
/// Callers wanting a longer wait must chain shorter ones; drivers clamp
/// anything larger to this value.
pub const MAX_SCHEDULE_DELAY_MS: u64 = 2_147_483_647;

/// Callback invoked when a scheduled entry comes due.
pub type ScheduleCallback = Box<dyn FnOnce() + Send + 'static>;

/// Platform timer facility.
///
/// Contract:
/// - `schedule_after` returns immediately; the callback runs later, at or
///   after the requested delay.
/// - `cancel` is idempotent and safe on already-fired handles. An entry
///   cancelled before delivery never runs its callback.
/// - `now` is monotonically non-decreasing for practical purposes.
pub trait TimerDriver: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now(&self) -> EpochMillis;

    /// Schedule `callback` to run once, `delay_ms` milliseconds from now.
    fn schedule_after(&self, delay_ms: u64, callback: ScheduleCallback) -> ScheduleHandle;

    /// Cancel a pending entry.
    fn cancel(&self, handle: ScheduleHandle);
}
