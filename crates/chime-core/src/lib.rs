//! Deadline scheduler: drift-corrected, pausable timers
//!
//! Platform timer APIs top out at a single delay of 2^31-1 ms (about
//! 24.8 days) and drift over long waits. The timers here chain
//! intermediate wake-ups that each halve the remaining wait, re-reading
//! the clock at every step, until the remainder is within
//! [`ACCURACY_MS`] of the deadline. Both timer flavors can be paused,
//! resumed and cleared at any point before completion.
//!
//! - [`create_timeout`] arms a one-shot [`Timeout`]
//! - [`create_interval`] arms a repeating [`Interval`]
//!
//! Both take the platform facility as an `Arc<dyn TimerDriver>`; see the
//! `chime-driver` crate for the production Tokio driver and the
//! virtual-clock driver used in tests.

mod arm;
mod interval;
mod schedule;
mod state;
mod timeout;

pub use arm::ACCURACY_MS;
pub use interval::{create_interval, Interval};
pub use schedule::Schedule;
pub use state::TimerState;
pub use timeout::{create_timeout, Timeout};
