//! End-to-end tests for the museum application on the headless backend.
//!
//! # Test Categories
//!
//! - **Startup**: every declared resource loads and the pass tree allocates
//! - **Frames**: every pass completes, markers balance, no target is read
//!   and written by one draw
//! - **Options**: switched-off effects report `Skipped(Disabled)`
//! - **Display**: resolution changes keep the object count stable
//! - **Shutdown**: nothing is left alive
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gitech-app --test scheme_tests
//! ```

use std::time::Duration;

use rstest::rstest;

use gitech_app::{App, DefaultAppArgs, DisplayChanges, DisplaySettings, RenderOptions};
use gitech_graphics::pass::GraphState;
use gitech_graphics::{LoadStrategy, PassStatus, SkipReason};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn args() -> DefaultAppArgs {
    DefaultAppArgs::default()
        .with_size(320, 180)
        .with_load_timeout(Duration::from_secs(30))
}

fn loaded(args: DefaultAppArgs, options: RenderOptions) -> App {
    init_logger();
    let mut app = App::with_options(&args, options).unwrap();
    app.load().unwrap();
    app
}

// ============================================================================
// Startup
// ============================================================================

#[rstest]
#[case::queue_1(LoadStrategy::Queue, 1)]
#[case::queue_4(LoadStrategy::Queue, 4)]
#[case::poll_4(LoadStrategy::Poll, 4)]
fn test_startup_loads_everything(#[case] strategy: LoadStrategy, #[case] threads: usize) {
    let app = loaded(
        args()
            .with_load_strategy(strategy)
            .with_loader_threads(threads),
        RenderOptions::default(),
    );

    let progress = app.loader().progress();
    assert_eq!(progress.ready, progress.total);
    assert_eq!(progress.failed, 0);
    assert_eq!(app.graph_state(), GraphState::Allocated);
    assert!(app.loader().is_finalized());
    assert!(app.live_objects().total() > 0);
}

#[test]
fn test_invalid_display_is_rejected() {
    init_logger();
    let result = App::new(&args().with_size(0, 720));
    assert!(result.is_err());
}

// ============================================================================
// Frames
// ============================================================================

#[test]
fn test_frames_complete_without_aliasing() {
    let mut app = loaded(args(), RenderOptions::default());

    for expected in 0..3 {
        let report = app.frame();
        assert_eq!(report.frame_index(), expected);
        assert!(
            report.is_complete(),
            "skipped: {:?}, failed: {:?}",
            report.skipped().collect::<Vec<_>>(),
            report.failed().map(|(name, _)| name).collect::<Vec<_>>()
        );
        assert_eq!(report.open_markers(), 0);
    }

    let backend = app.backend();
    assert_eq!(backend.aliasing_violations(), 0);
    assert!(backend.marker_stack().is_empty());
    assert!(backend.max_marker_depth() >= 3, "nested groups push markers");
    assert!(backend.draw_calls() > 0);
    assert_eq!(app.frame_index(), 3);
}

#[test]
fn test_visit_order_follows_the_tree() {
    let mut app = loaded(args(), RenderOptions::default());
    let report = app.frame();
    let visited = report.visited();

    let position = |name: &str| visited.iter().position(|n| *n == name).unwrap();
    assert_eq!(visited[0], "Frame");
    assert!(position("G-Buffer") < position("Scene Geometry"));
    assert!(position("Scene Geometry") < position("Lighting"));
    assert!(position("SSAO") < position("Screen Space Reflection"));
    assert!(position("Bloom") < position("HDR Tone Mapping"));
    assert_eq!(visited[visited.len() - 1], "UI");
}

// ============================================================================
// Options
// ============================================================================

#[rstest]
#[case::ssao(RenderOptions { ssao: false, ..Default::default() }, "SSAO")]
#[case::bloom(RenderOptions { bloom: false, ..Default::default() }, "Bloom")]
#[case::lens_flare(RenderOptions { lens_flare: false, ..Default::default() }, "Lens Flare")]
fn test_disabled_effect_is_skipped(#[case] options: RenderOptions, #[case] name: &str) {
    let mut app = loaded(args(), options);
    let report = app.frame();

    assert_eq!(
        report.status_of(name),
        Some(&PassStatus::Skipped(SkipReason::Disabled))
    );
    assert_eq!(report.skipped().count(), 1);
    assert_eq!(report.failed().count(), 0);
    assert_eq!(app.backend().aliasing_violations(), 0);
}

#[test]
fn test_disabled_post_processing_skips_its_subtree() {
    let mut app = loaded(
        args(),
        RenderOptions {
            post_processing: false,
            ..Default::default()
        },
    );
    let report = app.frame();

    assert_eq!(
        report.status_of("Post-Processing"),
        Some(&PassStatus::Skipped(SkipReason::Disabled))
    );
    assert_eq!(report.status_of("FXAA"), None);
    assert_eq!(report.status_of("UI"), Some(&PassStatus::Completed));
}

// ============================================================================
// Display
// ============================================================================

#[test]
fn test_resolution_change_keeps_object_count() {
    let mut app = loaded(args(), RenderOptions::default());
    app.frame();
    let before = app.live_objects();

    let changes = app
        .request_display_mode(DisplaySettings {
            width: 640,
            height: 360,
            ..app.display_settings()
        })
        .unwrap();
    assert_eq!(changes, DisplayChanges::RESOLUTION);

    let report = app.frame();
    assert!(report.is_complete());
    assert_eq!(app.display_settings().width, 640);
    assert_eq!(app.live_objects(), before);
    assert_eq!(app.backend().aliasing_violations(), 0);
}

#[test]
fn test_same_display_mode_is_not_queued() {
    let mut app = loaded(args(), RenderOptions::default());
    let current = app.display_settings();
    assert!(app.request_display_mode(current).unwrap().is_empty());
}

// ============================================================================
// Shutdown
// ============================================================================

#[rstest]
#[case::with_audio(args())]
#[case::without_audio(args().without_audio())]
fn test_shutdown_releases_everything(#[case] args: DefaultAppArgs) {
    let mut app = loaded(args, RenderOptions::default());
    app.frame();
    app.frame();

    let audio_sources = app.audio().source_count();
    assert_eq!(audio_sources, usize::from(app.ambient_source().is_some()));

    app.shutdown();
    assert_eq!(app.live_objects().total(), 0);
    assert_eq!(app.audio().source_count(), 0);
    assert_eq!(app.graph_state(), GraphState::Released);

    app.shutdown();
    assert_eq!(app.live_objects().total(), 0);
}

#[test]
fn test_run_frames_stops_at_limit() {
    init_logger();
    let mut app = App::new(&args().with_max_frames(4)).unwrap();
    app.run_frames().unwrap();
    assert!(app.is_done());
    assert_eq!(app.frame_index(), 4);
}
