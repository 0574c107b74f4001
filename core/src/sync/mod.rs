//! Blocking synchronization primitives for worker threads.
//!
//! - [`CancellationToken`] - Shared flag that asks cooperating threads to stop
//! - [`Countdown`] - Remaining-work counter with blocking wait/notify and deadlines
//! - [`OnceLatch`] - Single-use gate whose closure runs exactly once process-wide
//!
//! These back the renderer's resource loader: workers count records down,
//! block until the count reaches zero (or a deadline passes), then race
//! through a latch so exactly one of them runs the finalization step.

mod cancellation;
mod countdown;
mod latch;

pub use cancellation::CancellationToken;
pub use countdown::{Countdown, WaitOutcome};
pub use latch::{LatchEntry, OnceLatch};
