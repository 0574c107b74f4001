//! Integration tests for the concurrent resource loader.
//!
//! Tests are parameterized with `rstest` over worker counts and both work
//! distribution strategies.
//!
//! # Test Categories
//!
//! - **Exactly-once**: every record initialized once, by one thread at a time
//! - **Finalization**: the one-time step runs once, after everything is ready,
//!   and is visible to every worker when it returns
//! - **Failure**: failing records, stuck records with and without a deadline
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gitech-graphics --test loader_tests
//! ```

mod common;

use std::sync::Arc;
use std::sync::mpsc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rstest::rstest;

use common::{init_logger, mixed_registry, instrumented_registry};
use gitech_graphics::backend::{DummyResourceManager, Extent2d};
use gitech_graphics::resource::RecordState;
use gitech_graphics::{
    ConcurrentLoader, LoadError, LoadStrategy, LoaderConfig, ResourceError, ResourceId,
    ResourceManager,
};

fn config(strategy: LoadStrategy) -> LoaderConfig {
    LoaderConfig::default()
        .with_strategy(strategy)
        .with_poll_interval(Duration::from_micros(200))
}

fn counting_finalizer(
    loader: ConcurrentLoader,
) -> (ConcurrentLoader, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let loader = loader.with_finalizer(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (loader, count)
}

/// Poll `condition` until it holds or `limit` elapses.
fn wait_for(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

// ============================================================================
// Exactly-once initialization
// ============================================================================

#[rstest]
#[case::queue_1(LoadStrategy::Queue, 1)]
#[case::queue_4(LoadStrategy::Queue, 4)]
#[case::queue_64(LoadStrategy::Queue, 64)]
#[case::poll_1(LoadStrategy::Poll, 1)]
#[case::poll_4(LoadStrategy::Poll, 4)]
#[case::poll_64(LoadStrategy::Poll, 64)]
fn test_each_record_initialized_exactly_once(
    #[case] strategy: LoadStrategy,
    #[case] workers: usize,
) {
    init_logger();
    let (registry, resources, stats) =
        instrumented_registry(32, |_, resource| resource.with_work(Duration::from_micros(300)));
    let rm = Arc::new(DummyResourceManager::default());
    let (loader, finalized) =
        counting_finalizer(ConcurrentLoader::new(registry.clone(), rm, config(strategy)));
    let loader = Arc::new(loader);

    let reports = loader.run(workers).expect("loading succeeds");

    assert_eq!(reports.len(), workers);
    for resource in &resources {
        assert_eq!(resource.init_count(), 1);
        assert_eq!(resource.max_concurrent(), 1);
    }
    assert_eq!(stats.total_inits.load(Ordering::SeqCst), 32);
    assert_eq!(
        reports.iter().map(|r| r.initialized).sum::<usize>(),
        32,
        "every init is attributed to exactly one worker"
    );
    assert!(registry.is_fully_initialized());
    assert_eq!(finalized.load(Ordering::SeqCst), 1);
    assert_eq!(reports.iter().filter(|r| r.finalized).count(), 1);
    assert!(loader.is_finalized());
}

#[rstest]
#[case::queue(LoadStrategy::Queue)]
#[case::poll(LoadStrategy::Poll)]
fn test_ten_resources_four_workers(#[case] strategy: LoadStrategy) {
    init_logger();
    let (registry, resources, _) = instrumented_registry(10, |i, resource| {
        resource.with_work(Duration::from_micros(100 * (i as u64 % 4)))
    });
    let rm = Arc::new(DummyResourceManager::default());
    let (loader, finalized) =
        counting_finalizer(ConcurrentLoader::new(registry.clone(), rm, config(strategy)));

    Arc::new(loader).run(4).unwrap();

    assert!(resources.iter().all(|p| p.init_count() == 1));
    assert!(registry.progress().is_complete());
    assert_eq!(finalized.load(Ordering::SeqCst), 1);
}

#[test]
fn test_loader_creates_gpu_objects_through_resource_manager() {
    let (registry, target) = mixed_registry(5);
    let rm = Arc::new(DummyResourceManager::new(Extent2d::new(800, 600)));
    let loader = Arc::new(ConcurrentLoader::new(
        registry.clone(),
        rm.clone(),
        LoaderConfig::default(),
    ));

    loader.run(3).unwrap();

    let handle = target.target().expect("render target created");
    assert_eq!(rm.render_target_size(handle), Some(Extent2d::new(800, 600)));
    assert_eq!(rm.live_objects().render_targets, 1);

    assert_eq!(registry.free_all(rm.as_ref()), 6);
    assert_eq!(rm.live_objects().total(), 0);
}

// ============================================================================
// Finalization
// ============================================================================

#[rstest]
#[case::queue(LoadStrategy::Queue)]
#[case::poll(LoadStrategy::Poll)]
fn test_finalization_visible_to_every_worker(#[case] strategy: LoadStrategy) {
    let (registry, _, _) = instrumented_registry(16, |_, resource| resource);
    let rm = Arc::new(DummyResourceManager::default());
    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);
    let check = Arc::clone(&registry);
    let loader = Arc::new(
        ConcurrentLoader::new(registry, rm, config(strategy)).with_finalizer(move |_| {
            assert!(check.is_fully_initialized(), "finalizer ran early");
            std::thread::sleep(Duration::from_millis(30));
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }),
    );

    let handles: Vec<_> = (0..8)
        .map(|thread_id| {
            let loader = Arc::clone(&loader);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                loader.load_resources(thread_id, 8).unwrap();
                done.load(Ordering::SeqCst)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap(), "worker returned before finalization");
    }
}

#[test]
fn test_finalizer_error_reaches_every_worker() {
    let (registry, _, _) = instrumented_registry(4, |_, resource| resource);
    let rm = Arc::new(DummyResourceManager::default());
    let loader = Arc::new(
        ConcurrentLoader::new(registry, rm, LoaderConfig::default())
            .with_finalizer(|_| Err(ResourceError::OutOfMemory)),
    );

    let results: Vec<_> = (0..4)
        .map(|thread_id| {
            let loader = Arc::clone(&loader);
            std::thread::spawn(move || loader.load_resources(thread_id, 4))
        })
        .map(|handle| handle.join().unwrap())
        .collect();

    for result in results {
        assert_eq!(result, Err(LoadError::Finalization(ResourceError::OutOfMemory)));
    }
}

#[test]
fn test_panicking_finalizer_is_not_reported_as_finalized() {
    init_logger();
    let (registry, _, _) = instrumented_registry(4, |_, resource| resource);
    let rm = Arc::new(DummyResourceManager::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicBool::new(false));
    let loader = {
        let calls = Arc::clone(&calls);
        let completed = Arc::clone(&completed);
        Arc::new(
            ConcurrentLoader::new(registry, rm, LoaderConfig::default()).with_finalizer(move |_| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("finalizer blew up");
                }
                completed.store(true, Ordering::SeqCst);
                Ok(())
            }),
        )
    };

    let err = loader.run(2).unwrap_err();
    assert!(matches!(err, LoadError::FinalizerPanicked { .. }), "got {err:?}");

    // A later worker sees the same failure instead of a silent success.
    let late = loader.load_resources(1, 2);
    assert!(matches!(late, Err(LoadError::FinalizerPanicked { .. })), "got {late:?}");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!completed.load(Ordering::SeqCst));
    assert!(loader.is_finalized());
}

// ============================================================================
// Failure and timeouts
// ============================================================================

#[rstest]
#[case::queue(LoadStrategy::Queue)]
#[case::poll(LoadStrategy::Poll)]
fn test_failed_record_skips_finalization(#[case] strategy: LoadStrategy) {
    init_logger();
    let (registry, resources, _) =
        instrumented_registry(10, |i, resource| if i == 3 { resource.failing() } else { resource });
    let rm = Arc::new(DummyResourceManager::default());
    let (loader, finalized) =
        counting_finalizer(ConcurrentLoader::new(registry.clone(), rm, config(strategy)));

    let err = Arc::new(loader).run(4).unwrap_err();

    assert_eq!(
        err,
        LoadError::InitFailed {
            id: ResourceId(3),
            description: "resource #3".into(),
            source: ResourceError::Init("resource configured to fail".into()),
        }
    );
    assert_eq!(finalized.load(Ordering::SeqCst), 0);
    assert!(resources.iter().all(|p| p.init_count() == 1));
    let progress = registry.progress();
    assert_eq!((progress.ready, progress.failed), (9, 1));
}

#[rstest]
#[case::queue(LoadStrategy::Queue)]
#[case::poll(LoadStrategy::Poll)]
fn test_stuck_record_times_out(#[case] strategy: LoadStrategy) {
    init_logger();
    let gate = Arc::new(AtomicBool::new(false));
    let (registry, resources, _) = instrumented_registry(10, |i, resource| {
        if i == 7 {
            resource.stuck_until(Arc::clone(&gate))
        } else {
            resource
        }
    });
    let rm = Arc::new(DummyResourceManager::default());
    let (loader, finalized) = counting_finalizer(ConcurrentLoader::new(
        registry.clone(),
        rm,
        config(strategy).with_timeout(Duration::from_millis(300)),
    ));
    let loader = Arc::new(loader);
    let token = loader.cancellation_token();

    let workers = loader.spawn_workers(4).unwrap();
    assert!(
        wait_for(Duration::from_secs(10), || token.is_cancelled()),
        "deadline never tripped"
    );

    // Everything but the stuck record made it.
    for (i, record) in registry.iter().enumerate() {
        let expected = if i == 7 {
            RecordState::Declared
        } else {
            RecordState::Ready
        };
        assert_eq!(record.state(), expected, "record {i}");
    }

    gate.store(true, Ordering::SeqCst);
    let err = workers.join().unwrap_err();
    match err {
        LoadError::Timeout { pending, .. } => assert_eq!(pending, vec!["resource #7".to_owned()]),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(finalized.load(Ordering::SeqCst), 0);
    assert_eq!(resources[7].init_count(), 1);
}

#[test]
fn test_without_timeout_stuck_record_blocks_until_cancelled() {
    let gate = Arc::new(AtomicBool::new(false));
    let (registry, _, _) = instrumented_registry(10, |i, resource| {
        if i == 7 {
            resource.stuck_until(Arc::clone(&gate))
        } else {
            resource
        }
    });
    let rm = Arc::new(DummyResourceManager::default());
    let (loader, finalized) = counting_finalizer(ConcurrentLoader::new(
        registry.clone(),
        rm,
        LoaderConfig::default().without_timeout(),
    ));
    let loader = Arc::new(loader);

    let workers = loader.spawn_workers(2).unwrap();
    assert!(wait_for(Duration::from_secs(10), || {
        registry.progress().ready == 9
    }));
    std::thread::sleep(Duration::from_millis(200));
    assert!(!workers.is_finished());
    assert_eq!(registry.progress().pending(), 1);

    loader.cancel();
    gate.store(true, Ordering::SeqCst);
    assert_eq!(workers.join(), Err(LoadError::Cancelled));
    assert_eq!(finalized.load(Ordering::SeqCst), 0);
}

#[rstest]
#[case::queue(LoadStrategy::Queue)]
#[case::poll(LoadStrategy::Poll)]
fn test_run_returns_timeout_while_record_stays_stuck(#[case] strategy: LoadStrategy) {
    init_logger();
    let gate = Arc::new(AtomicBool::new(false));
    let (registry, resources, _) = instrumented_registry(10, |i, resource| {
        if i == 7 {
            resource.stuck_until(Arc::clone(&gate))
        } else {
            resource
        }
    });
    let rm = Arc::new(DummyResourceManager::default());
    let (loader, finalized) = counting_finalizer(ConcurrentLoader::new(
        registry.clone(),
        rm.clone(),
        config(strategy).with_timeout(Duration::from_millis(200)),
    ));
    let loader = Arc::new(loader);

    let (tx, rx) = mpsc::channel();
    let runner = Arc::clone(&loader);
    std::thread::spawn(move || {
        let _ = tx.send(runner.run(4));
    });

    // The gate stays closed: run must come back on its own.
    let result = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("run never returned while a record was stuck");
    match result {
        Err(LoadError::Timeout { pending, .. }) => {
            assert_eq!(pending, vec!["resource #7".to_owned()])
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(finalized.load(Ordering::SeqCst), 0);
    assert_eq!(resources[7].init_count(), 1);

    // The detached worker still owns record #7; teardown skips it.
    assert_eq!(registry.busy(), 1);
    assert_eq!(registry.free_all(rm.as_ref()), 9);

    gate.store(true, Ordering::SeqCst);
    assert!(wait_for(Duration::from_secs(10), || registry.busy() == 0));
}
