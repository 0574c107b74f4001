use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::ConcurrentLoader;
use crate::error::LoadError;

/// What one worker did during a [`load_resources`](super::ConcurrentLoader::load_resources) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Worker index in `0..thread_count`.
    pub thread_id: usize,
    /// Records this worker brought to the ready state.
    pub initialized: usize,
    /// Records whose initialization failed on this worker.
    pub failed: usize,
    /// Full registry scans (poll strategy only).
    pub scans: usize,
    /// Whether this worker ran the finalization step.
    pub finalized: bool,
    /// Wall time spent in the call.
    pub elapsed: Duration,
}

impl LoadReport {
    pub(super) fn new(thread_id: usize) -> Self {
        Self {
            thread_id,
            initialized: 0,
            failed: 0,
            scans: 0,
            finalized: false,
            elapsed: Duration::ZERO,
        }
    }
}

/// How often [`LoaderWorkers::join`] looks at its threads.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How long `join` keeps waiting for stragglers once loading was aborted.
const MIN_DETACH_GRACE: Duration = Duration::from_millis(50);

type WorkerHandle = JoinHandle<Result<LoadReport, LoadError>>;

/// Handles to spawned loader threads.
pub struct LoaderWorkers {
    handles: Vec<WorkerHandle>,
    loader: Arc<ConcurrentLoader>,
    started: Instant,
}

impl LoaderWorkers {
    pub(super) fn new(handles: Vec<WorkerHandle>, loader: Arc<ConcurrentLoader>) -> Self {
        Self {
            handles,
            loader,
            started: Instant::now(),
        }
    }

    /// Number of workers.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no worker was spawned.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether every worker has returned.
    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(JoinHandle::is_finished)
    }

    /// Whether [`join`](Self::join) would return without blocking on a
    /// worker: every worker returned, or loading was aborted.
    ///
    /// Trips the loader's deadline if it has passed, so a worker stuck
    /// inside an `init` cannot hold loading open past its timeout.
    pub fn is_settled(&self) -> bool {
        trip_deadline(&self.loader, self.started);
        self.is_finished() || self.loader.cancel.is_cancelled()
    }

    /// Wait for every worker.
    ///
    /// Returns the reports in thread order, or the most informative error:
    /// a worker that saw the actual failure wins over one that only
    /// observed the resulting cancellation.
    ///
    /// Once loading is aborted (timeout or cancel), workers that have not
    /// returned within a short grace period are detached and the recorded
    /// abort reason is returned. Without a timeout a stuck `init` still
    /// blocks until someone cancels.
    pub fn join(self) -> Result<Vec<LoadReport>, LoadError> {
        let Self {
            handles,
            loader,
            started,
        } = self;
        let grace = (loader.config.poll_interval * 2).max(MIN_DETACH_GRACE);
        let mut running: Vec<(usize, WorkerHandle)> = handles.into_iter().enumerate().collect();
        let mut results = Vec::with_capacity(running.len());
        let mut aborted_at: Option<Instant> = None;

        while !running.is_empty() {
            let (finished, still_running): (Vec<_>, Vec<_>) = running
                .into_iter()
                .partition(|(_, handle)| handle.is_finished());
            running = still_running;
            for (thread_id, handle) in finished {
                let result = handle
                    .join()
                    .unwrap_or(Err(LoadError::WorkerPanicked { thread_id }));
                results.push((thread_id, result));
            }
            if running.is_empty() {
                break;
            }

            trip_deadline(&loader, started);
            if loader.cancel.is_cancelled() {
                let aborted_at = *aborted_at.get_or_insert_with(Instant::now);
                if aborted_at.elapsed() >= grace {
                    let stuck: Vec<usize> = running.iter().map(|(thread_id, _)| *thread_id).collect();
                    log::warn!("Detaching loader thread(s) {stuck:?}; still inside a resource init");
                    break;
                }
            }
            std::thread::sleep(JOIN_POLL_INTERVAL);
        }
        results.sort_by_key(|(thread_id, _)| *thread_id);

        let mut reports = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for (_, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(err) => errors.push(err),
            }
        }
        if !running.is_empty() {
            errors.push(loader.abort_reason());
        }

        let mut first_error: Option<LoadError> = None;
        for err in errors {
            let replace = match &first_error {
                None => true,
                Some(LoadError::Cancelled) => err != LoadError::Cancelled,
                Some(_) => false,
            };
            if replace {
                first_error = Some(err);
            }
        }

        match first_error {
            Some(err) => {
                log::error!("Resource loading failed: {err}");
                Err(err)
            }
            None => {
                let finalized = reports.iter().filter(|r| r.finalized).count();
                debug_assert!(finalized <= 1, "finalization ran more than once");
                log::info!(
                    "Resource loading finished on {} thread(s)",
                    reports.len()
                );
                Ok(reports)
            }
        }
    }
}

impl std::fmt::Debug for LoaderWorkers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderWorkers")
            .field("workers", &self.handles.len())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

/// Time the loader out once its deadline has passed, even if every worker
/// that would notice is stuck.
fn trip_deadline(loader: &ConcurrentLoader, started: Instant) {
    if let Some(timeout) = loader.config.timeout
        && !loader.cancel.is_cancelled()
        && started.elapsed() >= timeout
    {
        loader.time_out(started);
    }
}
