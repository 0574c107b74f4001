use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// Result of blocking on a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The count reached zero.
    Reached,
    /// The deadline passed while work was still outstanding.
    TimedOut,
    /// [`Countdown::interrupt`] was called before the count reached zero.
    Interrupted,
}

#[derive(Debug)]
struct CountdownState {
    remaining: usize,
    interrupted: bool,
}

/// A thread-safe "remaining work" counter with blocking wait and notify.
///
/// Producers call [`count_down`](Self::count_down) once per finished item;
/// waiters block in [`wait`](Self::wait) or [`wait_until`](Self::wait_until)
/// and are woken when the count hits zero. Completion detection is therefore
/// push-based: nobody polls the counter.
///
/// # Example
///
/// ```
/// use gitech_core::sync::{Countdown, WaitOutcome};
/// use std::sync::Arc;
///
/// let countdown = Arc::new(Countdown::new(2));
/// let worker = {
///     let countdown = Arc::clone(&countdown);
///     std::thread::spawn(move || {
///         countdown.count_down();
///         countdown.count_down();
///     })
/// };
/// assert_eq!(countdown.wait(), WaitOutcome::Reached);
/// worker.join().unwrap();
/// ```
#[derive(Debug)]
pub struct Countdown {
    state: Mutex<CountdownState>,
    zero: Condvar,
}

impl Countdown {
    /// Creates a countdown expecting `count` completions.
    pub fn new(count: usize) -> Self {
        Self {
            state: Mutex::new(CountdownState {
                remaining: count,
                interrupted: false,
            }),
            zero: Condvar::new(),
        }
    }

    /// Number of completions still outstanding.
    pub fn remaining(&self) -> usize {
        self.state.lock().remaining
    }

    /// Records one completion and returns the new remaining count.
    ///
    /// Saturates at zero. All waiters are woken when the count reaches zero.
    pub fn count_down(&self) -> usize {
        let mut state = self.state.lock();
        state.remaining = state.remaining.saturating_sub(1);
        let remaining = state.remaining;
        if remaining == 0 {
            self.zero.notify_all();
        }
        remaining
    }

    /// Wakes every waiter with [`WaitOutcome::Interrupted`].
    ///
    /// Sticky: later waits return immediately unless the count is already zero.
    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        state.interrupted = true;
        self.zero.notify_all();
    }

    /// Blocks until the count reaches zero or the countdown is interrupted.
    pub fn wait(&self) -> WaitOutcome {
        self.wait_until(None)
    }

    /// Blocks until the count reaches zero, the countdown is interrupted, or
    /// `deadline` passes. `None` waits without a deadline.
    pub fn wait_until(&self, deadline: Option<Instant>) -> WaitOutcome {
        let mut state = self.state.lock();
        loop {
            if state.remaining == 0 {
                return WaitOutcome::Reached;
            }
            if state.interrupted {
                return WaitOutcome::Interrupted;
            }
            match deadline {
                Some(deadline) => {
                    if self.zero.wait_until(&mut state, deadline).timed_out() {
                        return if state.remaining == 0 {
                            WaitOutcome::Reached
                        } else {
                            WaitOutcome::TimedOut
                        };
                    }
                }
                None => self.zero.wait(&mut state),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn zero_count_is_immediately_reached() {
        let countdown = Countdown::new(0);
        assert_eq!(countdown.wait(), WaitOutcome::Reached);
    }

    #[test]
    fn count_down_saturates() {
        let countdown = Countdown::new(1);
        assert_eq!(countdown.count_down(), 0);
        assert_eq!(countdown.count_down(), 0);
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn wait_until_times_out_with_work_outstanding() {
        let countdown = Countdown::new(1);
        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(countdown.wait_until(Some(deadline)), WaitOutcome::TimedOut);
        assert_eq!(countdown.remaining(), 1);
    }

    #[test]
    fn waiters_are_woken_by_last_completion() {
        let countdown = Arc::new(Countdown::new(8));
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let countdown = Arc::clone(&countdown);
                std::thread::spawn(move || countdown.wait())
            })
            .collect();

        for _ in 0..8 {
            countdown.count_down();
        }

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), WaitOutcome::Reached);
        }
    }

    #[test]
    fn interrupt_wakes_waiters() {
        let countdown = Arc::new(Countdown::new(3));
        let waiter = {
            let countdown = Arc::clone(&countdown);
            std::thread::spawn(move || countdown.wait())
        };
        std::thread::sleep(Duration::from_millis(10));
        countdown.interrupt();
        assert_eq!(waiter.join().unwrap(), WaitOutcome::Interrupted);
        assert_eq!(countdown.wait(), WaitOutcome::Interrupted);
    }
}
