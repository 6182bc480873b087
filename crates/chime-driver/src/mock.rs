//! Virtual-clock driver for deterministic testing

use chime_util::{clamped_millis, EpochMillis};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::{HandlePayload, ScheduleCallback, ScheduleHandle, TimerDriver, MAX_SCHEDULE_DELAY_MS};

/// A driver whose clock only moves when the test calls [`advance`].
///
/// Entries fire in deadline order (insertion order within the same
/// deadline). Entries scheduled by a firing callback are themselves
/// eligible within the same `advance` call if they come due before the
/// target time. Cancelling removes the entry outright, so a cancelled
/// callback can never run.
///
/// [`advance`]: VirtualDriver::advance
pub struct VirtualDriver {
    next_id: AtomicU64,
    state: Mutex<VirtualState>,
}

struct VirtualState {
    now_ms: u64,
    // Keyed by (deadline, entry id) so iteration order is delivery order.
    queue: BTreeMap<(u64, u64), ScheduleCallback>,
}

impl VirtualDriver {
    pub fn new() -> Self {
        Self::starting_at(EpochMillis::from_millis(0))
    }

    /// Start the clock at a specific point in time.
    pub fn starting_at(start: EpochMillis) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state: Mutex::new(VirtualState {
                now_ms: start.as_millis(),
                queue: BTreeMap::new(),
            }),
        }
    }

    /// Move the clock forward, delivering every entry that comes due.
    ///
    /// The clock jumps to each entry's deadline as it fires, and the
    /// entry's callback runs with no lock held.
    pub fn advance(&self, delta: Duration) {
        let target = {
            let state = self.state.lock().unwrap();
            state.now_ms.saturating_add(clamped_millis(delta))
        };

        loop {
            let due = {
                let mut state = self.state.lock().unwrap();
                match state.queue.first_key_value() {
                    Some((&key, _)) if key.0 <= target => {
                        state.now_ms = state.now_ms.max(key.0);
                        state.queue.remove(&key)
                    }
                    _ => {
                        state.now_ms = target;
                        None
                    }
                }
            };

            match due {
                Some(callback) => callback(),
                None => break,
            }
        }
    }

    /// Number of entries waiting to fire.
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    /// Deadline of the entry that would fire next, if any.
    pub fn next_deadline(&self) -> Option<EpochMillis> {
        let state = self.state.lock().unwrap();
        state
            .queue
            .first_key_value()
            .map(|(&(fire_at, _), _)| EpochMillis::from_millis(fire_at))
    }
}

impl Default for VirtualDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriver for VirtualDriver {
    fn now(&self) -> EpochMillis {
        EpochMillis::from_millis(self.state.lock().unwrap().now_ms)
    }

    fn schedule_after(&self, delay_ms: u64, callback: ScheduleCallback) -> ScheduleHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let fire_at = state.now_ms.saturating_add(delay_ms.min(MAX_SCHEDULE_DELAY_MS));
        state.queue.insert((fire_at, id), callback);

        ScheduleHandle::new(HandlePayload::Virtual { id })
    }

    fn cancel(&self, handle: ScheduleHandle) {
        if let Some(id) = handle.payload().virtual_id() {
            let mut state = self.state.lock().unwrap();
            state.queue.retain(|&(_, entry_id), _| entry_id != id);
        }
    }
}
