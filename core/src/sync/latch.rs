use parking_lot::{Condvar, Mutex};

/// How a caller got through a [`OnceLatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchEntry {
    /// This caller ran the closure.
    Ran,
    /// Another caller ran (or was running) the closure; this one received its result.
    Waited,
}

#[derive(Debug)]
enum LatchState<T> {
    Open,
    Running,
    Done(T),
}

/// A single-use gate: the first caller of [`run_once`](Self::run_once) runs
/// its closure, every other caller blocks until that run finishes and then
/// receives a clone of its result.
///
/// # Ordering
///
/// Everything the winning closure wrote happens-before the return of every
/// `run_once` call that observes [`LatchEntry::Waited`]; the result is
/// published under the latch mutex and waiters re-acquire it before returning.
///
/// If the closure panics the latch re-opens, so a later caller can retry.
///
/// # Example
///
/// ```
/// use gitech_core::sync::{LatchEntry, OnceLatch};
///
/// let latch = OnceLatch::new();
/// assert_eq!(latch.run_once(|| 7), (7, LatchEntry::Ran));
/// assert_eq!(latch.run_once(|| 8), (7, LatchEntry::Waited));
/// ```
#[derive(Debug)]
pub struct OnceLatch<T> {
    state: Mutex<LatchState<T>>,
    done: Condvar,
}

impl<T: Clone> OnceLatch<T> {
    /// Creates an open latch.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LatchState::Open),
            done: Condvar::new(),
        }
    }

    /// Runs `f` if no caller has run it yet, otherwise waits for the winner.
    pub fn run_once<F>(&self, f: F) -> (T, LatchEntry)
    where
        F: FnOnce() -> T,
    {
        let mut state = self.state.lock();
        loop {
            if let LatchState::Done(value) = &*state {
                return (value.clone(), LatchEntry::Waited);
            }
            if matches!(*state, LatchState::Open) {
                break;
            }
            self.done.wait(&mut state);
        }
        *state = LatchState::Running;
        drop(state);

        let reopen = ReopenOnUnwind { latch: self };
        let value = f();
        std::mem::forget(reopen);

        let mut state = self.state.lock();
        *state = LatchState::Done(value.clone());
        self.done.notify_all();
        (value, LatchEntry::Ran)
    }

    /// Whether the closure has completed.
    pub fn is_done(&self) -> bool {
        matches!(*self.state.lock(), LatchState::Done(_))
    }

    /// The published result, if the closure has completed.
    pub fn get(&self) -> Option<T> {
        match &*self.state.lock() {
            LatchState::Done(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T: Clone> Default for OnceLatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct ReopenOnUnwind<'a, T> {
    latch: &'a OnceLatch<T>,
}

impl<T> Drop for ReopenOnUnwind<'_, T> {
    fn drop(&mut self) {
        let mut state = self.latch.state.lock();
        *state = LatchState::Open;
        self.latch.done.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn second_caller_gets_first_result() {
        let latch = OnceLatch::new();
        assert!(!latch.is_done());
        assert_eq!(latch.run_once(|| "first"), ("first", LatchEntry::Ran));
        assert_eq!(latch.run_once(|| "second"), ("first", LatchEntry::Waited));
        assert_eq!(latch.get(), Some("first"));
    }

    #[test]
    fn runs_exactly_once_under_contention() {
        let latch = Arc::new(OnceLatch::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let latch = Arc::clone(&latch);
                let runs = Arc::clone(&runs);
                std::thread::spawn(move || {
                    latch.run_once(|| {
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        runs.fetch_add(1, Ordering::SeqCst)
                    })
                })
            })
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcomes.iter().filter(|(_, e)| *e == LatchEntry::Ran).count(),
            1
        );
        assert!(outcomes.iter().all(|(value, _)| *value == 0));
    }

    #[test]
    fn waiters_observe_writes_made_by_winner() {
        let latch = Arc::new(OnceLatch::new());
        let data = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let latch = Arc::clone(&latch);
                let data = Arc::clone(&data);
                std::thread::spawn(move || {
                    latch.run_once(|| data.store(42, Ordering::Relaxed));
                    data.load(Ordering::Relaxed)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
    }

    #[test]
    fn panic_reopens_latch() {
        let latch = Arc::new(OnceLatch::new());
        let panicking = {
            let latch = Arc::clone(&latch);
            std::thread::spawn(move || {
                latch.run_once(|| -> u32 { panic!("finalizer failed") });
            })
        };
        assert!(panicking.join().is_err());
        assert!(!latch.is_done());
        assert_eq!(latch.run_once(|| 3), (3, LatchEntry::Ran));
    }
}
