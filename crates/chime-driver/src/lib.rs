//! Timer driver abstraction for chime
//!
//! The scheduler core never talks to a platform timer directly; it goes
//! through the [`TimerDriver`] trait. Two implementations ship here:
//! [`TokioDriver`] for production use inside a Tokio runtime, and
//! [`VirtualDriver`], a manually-advanced clock for deterministic tests.

mod handle;
mod mock;
mod tokio_driver;
mod traits;

pub use handle::*;
pub use mock::*;
pub use tokio_driver::*;
pub use traits::*;
