//! Concurrent resource loading.
//!
//! Any number of worker threads call [`ConcurrentLoader::load_resources`]
//! against one shared loader. Between them they bring every record of a
//! frozen [`ResourceRegistry`] to the ready state, each record exactly once
//! and by exactly one thread. Once a worker sees that every record is done
//! it passes the finalization latch; the first one through runs the
//! loader's finalizer (typically `PassGraph::allocate_resources`), every
//! other worker waits for that run to finish and shares its result.
//!
//! ```ignore
//! let loader = Arc::new(
//!     ConcurrentLoader::new(registry, resource_manager, LoaderConfig::default())
//!         .with_finalizer(move |rm| graph.lock().allocate_resources(rm)),
//! );
//! let reports = loader.spawn_workers(num_cpus)?.join()?;
//! ```
//!
//! # Failure
//!
//! A record whose initialization fails becomes [`RecordState::Failed`].
//! Loading still runs to completion for every other record, then all
//! workers return [`LoadError::InitFailed`] and the finalizer is skipped.
//! With a [`timeout`](LoaderConfig::timeout) configured, a loader that has
//! not converged by the deadline returns [`LoadError::Timeout`] listing the
//! records that were still pending, and cancels the remaining workers.
//! [`LoaderWorkers::join`] returns that reason even while a worker is still
//! stuck inside an `init`; the stuck thread is detached.
//!
//! A finalizer that panics is not retried: the panic is caught and every
//! worker returns [`LoadError::FinalizerPanicked`].

mod config;
mod workers;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use gitech_core::profiling::{profile_function, profile_plot, profile_scope_dynamic};
use gitech_core::sync::{CancellationToken, Countdown, LatchEntry, OnceLatch, WaitOutcome};
use parking_lot::Mutex;

pub use config::{LoadStrategy, LoaderConfig};
pub use workers::{LoadReport, LoaderWorkers};

use crate::backend::ResourceManager;
use crate::error::{LoadError, ResourceResult};
use crate::resource::{
    InitOutcome, LoadProgress, RecordGuard, RecordState, ResourceId, ResourceRecord,
    ResourceRegistry,
};

/// One-time step run after every record is ready.
pub type Finalizer = Box<dyn FnOnce(&dyn ResourceManager) -> ResourceResult<()> + Send>;

/// Drives worker threads over a [`ResourceRegistry`].
///
/// A loader is single-use: once it has finalized (or failed) it stays that
/// way. Create a new one to load a new registry.
pub struct ConcurrentLoader {
    registry: Arc<ResourceRegistry>,
    resource_manager: Arc<dyn ResourceManager>,
    config: LoaderConfig,
    next: AtomicUsize,
    remaining: Countdown,
    finalizer: Mutex<Option<Finalizer>>,
    finalization: OnceLatch<Result<(), LoadError>>,
    abort: Mutex<Option<LoadError>>,
    cancel: CancellationToken,
}

impl ConcurrentLoader {
    /// Create a loader without a finalizer.
    pub fn new(
        registry: Arc<ResourceRegistry>,
        resource_manager: Arc<dyn ResourceManager>,
        config: LoaderConfig,
    ) -> Self {
        let pending = registry.progress().pending();
        Self {
            registry,
            resource_manager,
            config,
            next: AtomicUsize::new(0),
            remaining: Countdown::new(pending),
            finalizer: Mutex::new(None),
            finalization: OnceLatch::new(),
            abort: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the one-time step run after every record is ready.
    pub fn with_finalizer<F>(self, finalizer: F) -> Self
    where
        F: FnOnce(&dyn ResourceManager) -> ResourceResult<()> + Send + 'static,
    {
        *self.finalizer.lock() = Some(Box::new(finalizer));
        self
    }

    /// The registry being loaded.
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// The configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Ready/failed/total counts, for loading screens.
    pub fn progress(&self) -> LoadProgress {
        self.registry.progress()
    }

    /// Whether the finalization step has completed (successfully or not).
    pub fn is_finalized(&self) -> bool {
        self.finalization.is_done()
    }

    /// A token that trips when loading is aborted (timeout or [`cancel`](Self::cancel)).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abort loading: every worker returns [`LoadError::Cancelled`] at its
    /// next checkpoint, and blocked workers wake up.
    pub fn cancel(&self) {
        self.abort_with(LoadError::Cancelled);
    }

    /// Worker entry point.
    ///
    /// Returns once every record is ready and the finalization step has run
    /// (by this or another worker), or with the reason loading stopped.
    pub fn load_resources(
        &self,
        thread_id: usize,
        thread_count: usize,
    ) -> Result<LoadReport, LoadError> {
        profile_function!();
        let thread_count = thread_count.max(1);
        debug_assert!(thread_id < thread_count, "thread id out of range");

        let started = Instant::now();
        let deadline = self.config.timeout.map(|timeout| started + timeout);
        let mut report = LoadReport::new(thread_id);

        match self.config.strategy {
            LoadStrategy::Queue => self.drain_queue(&mut report, started, deadline)?,
            LoadStrategy::Poll => {
                self.poll_registry(&mut report, thread_count, started, deadline)?
            }
        }
        self.check_failures()?;

        report.finalized = self.finalize(thread_id)?;
        report.elapsed = started.elapsed();
        log::debug!(
            "Thread {thread_id} - done: {} initialized in {:.2}ms",
            report.initialized,
            report.elapsed.as_secs_f64() * 1000.0
        );
        Ok(report)
    }

    /// Spawn `count` named worker threads running [`load_resources`](Self::load_resources).
    pub fn spawn_workers(self: &Arc<Self>, count: usize) -> Result<LoaderWorkers, LoadError> {
        let count = count.max(1);
        log::info!(
            "Loading {} resource(s) on {count} thread(s) ({:?} strategy)",
            self.registry.len(),
            self.config.strategy
        );

        let mut handles = Vec::with_capacity(count);
        for thread_id in 0..count {
            let loader = Arc::clone(self);
            let spawned = std::thread::Builder::new()
                .name(format!("resource-loader-{thread_id}"))
                .spawn(move || {
                    gitech_core::profiling::set_thread_name!("Resource Loader");
                    loader.load_resources(thread_id, count)
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    self.cancel();
                    return Err(LoadError::Spawn(err.to_string()));
                }
            }
        }
        Ok(LoaderWorkers::new(handles, Arc::clone(self)))
    }

    /// Spawn `count` workers and wait for all of them, or until loading is
    /// aborted (see [`LoaderWorkers::join`]).
    pub fn run(self: &Arc<Self>, count: usize) -> Result<Vec<LoadReport>, LoadError> {
        self.spawn_workers(count)?.join()
    }

    // ========================================================================
    // Strategies
    // ========================================================================

    fn drain_queue(
        &self,
        report: &mut LoadReport,
        started: Instant,
        deadline: Option<Instant>,
    ) -> Result<(), LoadError> {
        let total = self.registry.len();
        loop {
            self.check_abort()?;
            let index = self.next.fetch_add(1, Ordering::AcqRel);
            if index >= total {
                break;
            }
            if let Some(record) = self.registry.get(ResourceId(index)) {
                self.initialize(record, record.lock(), report);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(self.time_out(started));
            }
        }

        match self.remaining.wait_until(deadline) {
            WaitOutcome::Reached => self.check_abort(),
            WaitOutcome::TimedOut => Err(self.time_out(started)),
            WaitOutcome::Interrupted => Err(self.abort_reason()),
        }
    }

    fn poll_registry(
        &self,
        report: &mut LoadReport,
        thread_count: usize,
        started: Instant,
        deadline: Option<Instant>,
    ) -> Result<(), LoadError> {
        let total = self.registry.len();
        // Start each worker at a different offset so they do not all contend
        // on the first pending record.
        let offset = if total == 0 {
            0
        } else {
            report.thread_id * total / thread_count % total
        };

        loop {
            self.check_abort()?;
            report.scans += 1;

            let mut pending = 0;
            for record in self.registry.iter().cycle().skip(offset).take(total) {
                if record.state() != RecordState::Declared {
                    continue;
                }
                pending += 1;
                if let Some(guard) = record.try_lock() {
                    self.initialize(record, guard, report);
                }
            }
            profile_plot!("Resources pending", pending);

            if pending == 0 {
                return Ok(());
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(self.time_out(started));
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    // ========================================================================
    // Per-record work
    // ========================================================================

    fn initialize(&self, record: &ResourceRecord, mut guard: RecordGuard<'_>, report: &mut LoadReport) {
        if record.state() != RecordState::Declared {
            return;
        }
        profile_scope_dynamic!(record.description());
        let thread_id = report.thread_id;
        log::debug!(
            "Thread {thread_id} - {}: \"{}\" start",
            record.kind(),
            record.description()
        );

        let started = Instant::now();
        let result = guard.init(self.resource_manager.as_ref());
        drop(guard);

        match result {
            Ok(InitOutcome::Initialized) => {
                report.initialized += 1;
                log::debug!(
                    "Thread {thread_id} - {}: \"{}\" finished in {:.2}ms",
                    record.kind(),
                    record.description(),
                    started.elapsed().as_secs_f64() * 1000.0
                );
                self.remaining.count_down();
            }
            Ok(InitOutcome::AlreadyInitialized) => {}
            Err(err) => {
                report.failed += 1;
                log::error!(
                    "Thread {thread_id} - {}: \"{}\" failed: {err}",
                    record.kind(),
                    record.description()
                );
                self.remaining.count_down();
            }
        }
    }

    fn check_failures(&self) -> Result<(), LoadError> {
        match self.registry.iter().find(|record| record.is_failed()) {
            Some(record) => Err(LoadError::InitFailed {
                id: record.id(),
                description: record.description().to_owned(),
                source: record
                    .failure()
                    .unwrap_or_else(|| crate::error::ResourceError::Init("unknown failure".into())),
            }),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Finalization and abort
    // ========================================================================

    fn finalize(&self, thread_id: usize) -> Result<bool, LoadError> {
        self.check_abort()?;
        let (outcome, entry) = self.finalization.run_once(|| {
            let Some(finalizer) = self.finalizer.lock().take() else {
                return Ok(());
            };
            log::info!("Thread {thread_id} - running one-time resource finalization");
            let started = Instant::now();
            let resource_manager = self.resource_manager.as_ref();
            let result = match panic::catch_unwind(AssertUnwindSafe(|| finalizer(resource_manager))) {
                Ok(result) => result.map_err(LoadError::Finalization),
                Err(_) => {
                    log::error!("Thread {thread_id} - finalization panicked");
                    Err(LoadError::FinalizerPanicked { thread_id })
                }
            };
            log::info!(
                "Thread {thread_id} - finalization finished in {:.2}ms",
                started.elapsed().as_secs_f64() * 1000.0
            );
            result
        });
        outcome.map(|()| entry == LatchEntry::Ran)
    }

    fn check_abort(&self) -> Result<(), LoadError> {
        if self.cancel.is_cancelled() {
            Err(self.abort_reason())
        } else {
            Ok(())
        }
    }

    fn abort_reason(&self) -> LoadError {
        self.abort.lock().clone().unwrap_or(LoadError::Cancelled)
    }

    /// Record the first abort reason, trip the token and wake every waiter.
    /// Returns the reason that ended up recorded.
    fn abort_with(&self, reason: LoadError) -> LoadError {
        let recorded = self.abort.lock().get_or_insert(reason).clone();
        self.cancel.cancel();
        self.remaining.interrupt();
        recorded
    }

    fn time_out(&self, started: Instant) -> LoadError {
        let pending: Vec<String> = self
            .registry
            .iter()
            .filter(|record| record.state() == RecordState::Declared)
            .map(|record| record.description().to_owned())
            .collect();
        let elapsed = started.elapsed();
        log::warn!(
            "Resource loading timed out after {:.2}s; still pending: {pending:?}",
            elapsed.as_secs_f64()
        );
        self.abort_with(LoadError::Timeout {
            elapsed: round_to_millis(elapsed),
            pending,
        })
    }
}

fn round_to_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}

impl std::fmt::Debug for ConcurrentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentLoader")
            .field("config", &self.config)
            .field("progress", &self.progress())
            .field("finalized", &self.is_finalized())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
