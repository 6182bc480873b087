//! One-shot timer state machine

use chime_driver::{ScheduleCallback, ScheduleHandle, TimerDriver};
use chime_util::{EpochMillis, TimerId};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

use crate::arm::{next_wakeup, Wakeup};
use crate::{Schedule, TimerState};

/// A drift-corrected one-shot timer.
///
/// Created in the waiting state with arming already started. The callback
/// runs exactly once, unless [`clear`](Timeout::clear) wins the race.
/// Dropping the handle does not stop the timer.
pub struct Timeout {
    id: TimerId,
    driver: Arc<dyn TimerDriver>,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    deadline: EpochMillis,
    handle: Option<ScheduleHandle>,
    pause_remaining: Option<u64>,
    completed: bool,
    // Bumped on every transition; a delivered wake-up whose captured
    // generation no longer matches must not act.
    generation: u64,
    callback: Option<Box<dyn FnOnce() + Send>>,
}

/// Create a one-shot timer that invokes `callback` once `schedule` comes due.
///
/// `schedule` accepts a relative `Duration`, an absolute `EpochMillis`, a
/// `chrono::DateTime<Utc>`, or an explicit [`Schedule`].
pub fn create_timeout<F>(
    driver: Arc<dyn TimerDriver>,
    callback: F,
    schedule: impl Into<Schedule>,
) -> Timeout
where
    F: FnOnce() + Send + 'static,
{
    let id = TimerId::new();
    let deadline = schedule.into().resolve(driver.now());

    let inner = Arc::new(Mutex::new(Inner {
        deadline,
        handle: None,
        pause_remaining: None,
        completed: false,
        generation: 0,
        callback: Some(Box::new(callback)),
    }));

    debug!(timer_id = %id, deadline = %deadline, "timeout created");
    arm(&driver, &inner, id);

    Timeout { id, driver, inner }
}

impl Timeout {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Target fire time. Refreshed on resume; stale while paused.
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

    /// Suspend the countdown, capturing the remaining duration.
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
        debug!(timer_id = %self.id, remaining_ms = remaining, "timeout paused");

        self
    }

    /// Restart the countdown from the remaining duration captured at pause.
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
                debug!(timer_id = %self.id, deadline = %inner.deadline, "timeout resumed");
            }
        }
        arm(&self.driver, &self.inner, self.id);
        self
    }

    /// Cancel the timer. The callback will not be invoked, even if the
    /// deadline has already passed. Safe in every state.
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
        debug!(timer_id = %self.id, "timeout cleared");
    }
}

/// Schedule the next wake-up of the chain. Re-invoked by each delivered
/// intermediate wake-up until the remainder is small enough to fire.
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
    trace!(timer_id = %id, wakeup = ?wakeup, "timeout armed");

    let driver_cb = driver.clone();
    let inner_cb = inner.clone();
    let callback: ScheduleCallback = match wakeup {
        Wakeup::Fire { .. } => Box::new(move || {
            let user_callback = {
                let mut state = inner_cb.lock().unwrap();
                if state.completed || state.generation != generation {
                    return;
                }
                state.completed = true;
                state.handle = None;
                state.pause_remaining = None;
                state.callback.take()
            };
            if let Some(callback) = user_callback {
                debug!(timer_id = %id, "timeout fired");
                callback();
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use chime_driver::VirtualDriver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fixture() -> (Arc<VirtualDriver>, Arc<AtomicUsize>) {
        (Arc::new(VirtualDriver::new()), Arc::new(AtomicUsize::new(0)))
    }

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn fires_once_after_delay() {
        let (driver, fired) = fixture();
        let timer = create_timeout(
            driver.clone(),
            counting(&fired),
            Duration::from_millis(100),
        );

        assert_eq!(timer.state(), TimerState::Waiting);

        driver.advance(Duration::from_millis(99));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        driver.advance(Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timer.state(), TimerState::Completed);

        // Nothing left with the driver once completed.
        assert_eq!(driver.pending(), 0);

        driver.advance(Duration::from_millis(10_000));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_delay_fires_on_next_turn() {
        let (driver, fired) = fixture();
        let timer = create_timeout(driver.clone(), counting(&fired), Duration::ZERO);

        assert_eq!(timer.state(), TimerState::Waiting);
        driver.advance(Duration::ZERO);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn absolute_deadline_in_past_fires_immediately() {
        let driver = Arc::new(VirtualDriver::starting_at(EpochMillis::from_millis(5_000)));
        let fired = Arc::new(AtomicUsize::new(0));

        let _timer = create_timeout(
            driver.clone(),
            counting(&fired),
            EpochMillis::from_millis(1_000),
        );

        driver.advance(Duration::ZERO);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_prevents_callback() {
        let (driver, fired) = fixture();
        let timer = create_timeout(
            driver.clone(),
            counting(&fired),
            Duration::from_millis(100),
        );

        timer.clear();
        assert_eq!(timer.state(), TimerState::Completed);

        driver.advance(Duration::from_millis(1_000));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clear_is_terminal() {
        let (driver, fired) = fixture();
        let timer = create_timeout(
            driver.clone(),
            counting(&fired),
            Duration::from_millis(100),
        );

        timer.clear();
        timer.pause();
        timer.resume();
        timer.clear();
        assert_eq!(timer.state(), TimerState::Completed);

        driver.advance(Duration::from_millis(1_000));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pause_then_resume_uses_remaining() {
        let (driver, fired) = fixture();
        let timer = create_timeout(
            driver.clone(),
            counting(&fired),
            Duration::from_millis(200),
        );

        driver.advance(Duration::from_millis(60));
        timer.pause();
        assert_eq!(timer.state(), TimerState::Paused);

        // Well past the original deadline; paused timers never fire.
        driver.advance(Duration::from_millis(10_000));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        timer.resume();
        assert_eq!(timer.state(), TimerState::Waiting);

        driver.advance(Duration::from_millis(139));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        driver.advance(Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeated_pause_preserves_first_remaining() {
        let (driver, fired) = fixture();
        let timer = create_timeout(
            driver.clone(),
            counting(&fired),
            Duration::from_millis(200),
        );

        driver.advance(Duration::from_millis(50));
        timer.pause(); // captures 150
        driver.advance(Duration::from_millis(40));
        timer.pause(); // must not re-capture

        timer.resume();
        driver.advance(Duration::from_millis(149));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        driver.advance(Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resume_while_waiting_is_idempotent() {
        let (driver, fired) = fixture();
        let timer = create_timeout(
            driver.clone(),
            counting(&fired),
            Duration::from_millis(100),
        );

        timer.resume().resume().resume();
        assert_eq!(driver.pending(), 1);

        driver.advance(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pause_after_deadline_passed_still_blocks_fire() {
        let driver = Arc::new(VirtualDriver::starting_at(EpochMillis::from_millis(5_000)));
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = create_timeout(
            driver.clone(),
            counting(&fired),
            EpochMillis::from_millis(1_000),
        );

        // Deadline is already behind us and the wake-up is pending
        // delivery; pausing still wins.
        timer.pause();
        driver.advance(Duration::from_millis(500));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Captured remaining is zero: fires on the next turn after resume.
        timer.resume();
        driver.advance(Duration::ZERO);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_wins_race_with_pending_delivery() {
        let driver = Arc::new(VirtualDriver::starting_at(EpochMillis::from_millis(5_000)));
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = create_timeout(
            driver.clone(),
            counting(&fired),
            EpochMillis::from_millis(1_000),
        );

        timer.clear();
        driver.advance(Duration::from_millis(1_000));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn long_delay_chains_without_overflow() {
        let (driver, fired) = fixture();
        let thirty_days = Duration::from_secs(30 * 24 * 3600);
        let timer = create_timeout(driver.clone(), counting(&fired), thirty_days);

        let deadline = timer.deadline();

        // Never more than one outstanding wake-up, and never a single
        // delay beyond the platform maximum.
        let mut hops = 0;
        while fired.load(Ordering::SeqCst) == 0 {
            assert_eq!(driver.pending(), 1);
            let next = driver.next_deadline().unwrap();
            assert!(
                next.saturating_millis_until(driver.now())
                    <= chime_driver::MAX_SCHEDULE_DELAY_MS
            );
            driver.advance(next.saturating_duration_until(driver.now()));
            hops += 1;
            assert!(hops < 64, "chain failed to converge");
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timer.state(), TimerState::Completed);

        // Fired within the accuracy window of the true deadline.
        let overshoot = driver.now().saturating_millis_until(deadline);
        assert!(overshoot <= crate::ACCURACY_MS);
        assert!(driver.now() >= deadline);
    }

    #[test]
    fn callback_dropped_on_clear() {
        let (driver, _) = fixture();
        let dropped = Arc::new(AtomicUsize::new(0));

        struct DropProbe(Arc<AtomicUsize>);
        impl Drop for DropProbe {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let probe = DropProbe(dropped.clone());
        let timer = create_timeout(
            driver.clone(),
            move || {
                let _ = &probe;
            },
            Duration::from_millis(100),
        );

        timer.clear();
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }
}
