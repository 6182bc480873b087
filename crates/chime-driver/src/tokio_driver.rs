//! Tokio-backed timer driver

use chime_util::{clamped_millis, EpochMillis};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::trace;

use crate::{HandlePayload, ScheduleCallback, ScheduleHandle, TimerDriver, MAX_SCHEDULE_DELAY_MS};

/// Production driver running on a Tokio runtime.
///
/// `now()` is anchored once at construction: wall-clock offset plus
/// monotonic elapsed time, so it never goes backwards even if the system
/// clock is adjusted. The monotonic source is `tokio::time::Instant`,
/// which follows Tokio's paused test clock.
pub struct TokioDriver {
    epoch_offset_ms: u64,
    anchor: tokio::time::Instant,
}

impl TokioDriver {
    /// Create a driver. Must be called (and used) inside a Tokio runtime.
    pub fn new() -> Self {
        let epoch_offset_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(clamped_millis)
            .unwrap_or(0);

        Self {
            epoch_offset_ms,
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriver for TokioDriver {
    fn now(&self) -> EpochMillis {
        let elapsed_ms = clamped_millis(self.anchor.elapsed());
        EpochMillis::from_millis(self.epoch_offset_ms.saturating_add(elapsed_ms))
    }

    fn schedule_after(&self, delay_ms: u64, callback: ScheduleCallback) -> ScheduleHandle {
        let delay = Duration::from_millis(delay_ms.min(MAX_SCHEDULE_DELAY_MS));
        trace!(delay_ms = delay.as_millis() as u64, "scheduling wake-up");

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });

        ScheduleHandle::new(HandlePayload::Tokio {
            abort: task.abort_handle(),
        })
    }

    fn cancel(&self, handle: ScheduleHandle) {
        if let HandlePayload::Tokio { abort } = handle.payload() {
            abort.abort();
        }
    }
}
