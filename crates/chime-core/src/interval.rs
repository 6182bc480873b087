//! Repeating timer state machine

use chime_driver::{ScheduleCallback, ScheduleHandle, TimerDriver};
use chime_util::{clamped_millis, EpochMillis, TimerId};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace};

use crate::arm::{next_wakeup, Wakeup};
use crate::{Schedule, TimerState};

/// A drift-corrected repeating timer.
///
/// Fires its callback once per interval until [`clear`](Interval::clear)
/// is called; there is no natural completion. Ticks missed while the
/// consumer was slow (or the process suspended) are skipped, not
/// replayed. Dropping the handle does not stop the timer.
pub struct Interval {
    id: TimerId,
    driver: Arc<dyn TimerDriver>,
    inner: Arc<Mutex<Inner>>,
}

type IntervalCallback = Arc<Mutex<dyn FnMut() + Send>>;

struct Inner {
    deadline: EpochMillis,
    every_ms: u64,
    handle: Option<ScheduleHandle>,
    pause_remaining: Option<u64>,
    completed: bool,
    // Bumped on every transition; a delivered wake-up whose captured
    // generation no longer matches must not act.
    generation: u64,
    callback: Option<IntervalCallback>,
}

/// Create a repeating timer that invokes `callback` every `every`.
///
/// `schedule` sets the first firing; with the default (zero delay) the
/// first firing follows one interval-length after creation. A zero
/// `every` degenerates to firing exactly once: the next-deadline
/// computation cannot advance past the current time, so the timer
/// completes after the first fire instead of rescheduling.
pub fn create_interval<F>(
    driver: Arc<dyn TimerDriver>,
    callback: F,
    every: Duration,
    schedule: impl Into<Schedule>,
) -> Interval
where
    F: FnMut() + Send + 'static,
{
    let id = TimerId::new();
    let now = driver.now();
    let every_ms = clamped_millis(every);
    let start = schedule.into().resolve(now);
    let deadline = next_tick(start, every_ms, now);

    let inner = Arc::new(Mutex::new(Inner {
        deadline,
        every_ms,
        handle: None,
        pause_remaining: None,
        completed: false,
        generation: 0,
        callback: Some(Arc::new(Mutex::new(callback))),
    }));

    debug!(timer_id = %id, deadline = %deadline, every_ms, "interval created");
    arm(&driver, &inner, id);

    Interval { id, driver, inner }
}

impl Interval {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Interval length between firings.
    pub fn every(&self) -> Duration {
        Duration::from_millis(self.inner.lock().unwrap().every_ms)
    }

    /// Next target fire time. Refreshed on resume; stale while paused.
    pub fn deadline(&self) -> EpochMillis {
        self.inner.lock().unwrap().deadline
    }

    pub fn state(&self) -> TimerState {
        let inner = self.inner.lock().unwrap();
        if inner.completed {
            TimerState::Completed
        } else if inner.pause_remaining.is_some() {
            TimerState::Paused
        } else {
            TimerState::Waiting
        }
    }

    /// Suspend the countdown to the next firing.
    ///
    /// Pausing an already-paused timer keeps the originally captured
    /// remaining duration. No-op once completed.
    pub fn pause(&self) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        if inner.completed {
            return self;
        }

        inner.generation += 1;
        if let Some(handle) = inner.handle.take() {
            self.driver.cancel(handle);
        }

        let captured = inner.deadline.saturating_millis_until(self.driver.now());
        let remaining = *inner.pause_remaining.get_or_insert(captured);
        debug!(timer_id = %self.id, remaining_ms = remaining, "interval paused");

        self
    }

    /// Restart the countdown from the remaining duration captured at
    /// pause. Firings missed while paused are not replayed.
    ///
    /// On a timer that is already waiting this is a safe re-arm; it never
    /// results in two outstanding wake-ups. No-op once completed.
    pub fn resume(&self) -> &Self {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.completed {
                return self;
            }
            if let Some(remaining) = inner.pause_remaining.take() {
                inner.deadline = self.driver.now().saturating_add_millis(remaining);
                debug!(timer_id = %self.id, deadline = %inner.deadline, "interval resumed");
            }
        }
        arm(&self.driver, &self.inner, self.id);
        self
    }

    /// Stop the timer permanently. The only way a repeating timer
    /// terminates. Safe in every state.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.completed {
            return;
        }

        inner.generation += 1;
        if let Some(handle) = inner.handle.take() {
            self.driver.cancel(handle);
        }
        inner.pause_remaining = None;
        inner.callback = None;
        inner.completed = true;
        debug!(timer_id = %self.id, "interval cleared");
    }
}

/// Earliest multiple of `every_ms` past `from` that is still ahead of
/// `now`. Returns `from` unchanged when the step is zero or `from` is
/// already ahead.
fn next_tick(from: EpochMillis, every_ms: u64, now: EpochMillis) -> EpochMillis {
    if every_ms == 0 || from > now {
        return from;
    }
    let behind = now.as_millis() - from.as_millis();
    let steps = behind / every_ms + 1;
    from.saturating_add_millis(steps.saturating_mul(every_ms))
}

/// Schedule the next wake-up of the chain. Re-invoked by each delivered
/// intermediate wake-up, and by the fire path after every tick.
fn arm(driver: &Arc<dyn TimerDriver>, inner: &Arc<Mutex<Inner>>, id: TimerId) {
    let mut state = inner.lock().unwrap();
    if state.completed || state.pause_remaining.is_some() {
        return;
    }

    state.generation += 1;
    let generation = state.generation;
    if let Some(old) = state.handle.take() {
        driver.cancel(old);
    }

    let wakeup = next_wakeup(driver.now(), state.deadline);
    trace!(timer_id = %id, wakeup = ?wakeup, "interval armed");

    let driver_cb = driver.clone();
    let inner_cb = inner.clone();
    let callback: ScheduleCallback = match wakeup {
        Wakeup::Fire { .. } => Box::new(move || {
            let user_callback = {
                let mut state = inner_cb.lock().unwrap();
                if state.completed || state.generation != generation {
                    return;
                }
                state.handle = None;
                match &state.callback {
                    Some(callback) => callback.clone(),
                    None => return,
                }
            };

            debug!(timer_id = %id, "interval fired");
            (&mut *user_callback.lock().unwrap())();

            {
                let mut state = inner_cb.lock().unwrap();
                // The callback may have paused or cleared the timer.
                if state.completed || state.generation != generation {
                    return;
                }
                if state.every_ms == 0 {
                    state.pause_remaining = None;
                    state.callback = None;
                    state.completed = true;
                    debug!(timer_id = %id, "interval completed (zero length)");
                    return;
                }
                state.deadline = next_tick(state.deadline, state.every_ms, driver_cb.now());
            }
            arm(&driver_cb, &inner_cb, id);
        }),
        Wakeup::Rearm { .. } => Box::new(move || {
            {
                let state = inner_cb.lock().unwrap();
                if state.completed || state.generation != generation {
                    return;
                }
            }
            arm(&driver_cb, &inner_cb, id);
        }),
    };

    state.handle = Some(driver.schedule_after(wakeup.after_ms(), callback));
}
