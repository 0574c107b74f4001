//! Application lifecycle: load, frame loop, display changes and shutdown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gitech_core::profiling::frame_mark;
use gitech_graphics::backend::{DummyBackend, DummyResourceManager, LiveObjects};
use gitech_graphics::pass::GraphState;
use gitech_graphics::resource::ResourceRegistry;
use gitech_graphics::{
    ConcurrentLoader, FrameContext, FrameReport, LoadReport, PassGraph, RenderBackend,
    ResourceManager,
};
use parking_lot::Mutex;

use crate::args::AppArgs;
use crate::audio::{AudioDevice, NullAudioDevice, SoundSourceId};
use crate::display::{DisplayChanges, DisplaySettings};
use crate::error::{AppError, AppResult};
use crate::scene::{SceneResources, declare_scene_resources};
use crate::scheme::{RenderOptions, build_render_scheme};

/// Looping background sound started with the scene.
const AMBIENT_SOUND: &str = "sounds/museum_ambient.ogg";

/// How often progress is logged while the loader runs.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Frame time targeted when vsync is on and no display paces the loop.
const VSYNC_INTERVAL: Duration = Duration::from_micros(16_667);

/// The museum application on the headless backend.
///
/// Lifecycle:
///
/// 1. [`App::new`] declares resources, builds the pass tree and the loader,
///    and starts ambient audio.
/// 2. [`App::load`] runs the loader workers. Their finalization step
///    allocates the pass tree's own resources.
/// 3. [`App::frame`] applies pending display changes and draws one frame.
/// 4. [`App::shutdown`] (also run on drop) stops audio and releases every
///    GPU object.
///
/// # Example
///
/// ```ignore
/// use gitech_app::{App, DefaultAppArgs};
///
/// let args = DefaultAppArgs::default().with_max_frames(10);
/// let mut app = App::new(&args)?;
/// app.load()?;
/// while !app.is_done() {
///     app.frame();
/// }
/// app.shutdown();
/// ```
pub struct App {
    title: String,
    display: DisplaySettings,
    pending_display: Option<DisplaySettings>,
    resource_manager: Arc<DummyResourceManager>,
    backend: DummyBackend,
    registry: Arc<ResourceRegistry>,
    scene: SceneResources,
    graph: Arc<Mutex<PassGraph>>,
    loader: Arc<ConcurrentLoader>,
    loader_threads: usize,
    audio: Box<dyn AudioDevice>,
    ambient: Option<SoundSourceId>,
    max_frames: Option<u64>,
    frame_index: u64,
    last_frame: Instant,
    shut_down: bool,
}

impl App {
    /// Create the application with the effect switches from `args`.
    pub fn new<A: AppArgs>(args: &A) -> AppResult<Self> {
        Self::with_options(args, args.render_options())
    }

    /// Create the application with explicit effect switches.
    pub fn with_options<A: AppArgs>(args: &A, options: RenderOptions) -> AppResult<Self> {
        let display = args.display_settings();
        display.validate().map_err(AppError::InvalidArgs)?;

        let resource_manager = Arc::new(DummyResourceManager::new(display.back_buffer()));
        let backend = DummyBackend::with_resource_manager(Arc::clone(&resource_manager));
        log::info!("Using {} backend at {display}", backend.name());

        let mut builder = ResourceRegistry::builder();
        let scene = declare_scene_resources(&mut builder);
        let registry = Arc::new(builder.build());

        let graph = Arc::new(Mutex::new(PassGraph::new(build_render_scheme(
            &scene, &options,
        ))));
        let finalize_graph = Arc::clone(&graph);
        let loader = Arc::new(
            ConcurrentLoader::new(
                Arc::clone(&registry),
                Arc::clone(&resource_manager) as Arc<dyn ResourceManager>,
                args.loader_config(),
            )
            .with_finalizer(move |resource_manager| {
                finalize_graph.lock().allocate_resources(resource_manager)
            }),
        );

        let mut audio: Box<dyn AudioDevice> = Box::new(NullAudioDevice::new());
        let ambient = if args.audio() {
            Some(start_ambient_sound(audio.as_mut()))
        } else {
            log::info!("Audio disabled");
            None
        };

        Ok(Self {
            title: args.window_title().to_owned(),
            display,
            pending_display: None,
            resource_manager,
            backend,
            registry,
            scene,
            graph,
            loader,
            loader_threads: args.loader_threads().max(1),
            audio,
            ambient,
            max_frames: args.max_frames(),
            frame_index: 0,
            last_frame: Instant::now(),
            shut_down: false,
        })
    }

    /// Load every declared resource and allocate the pass tree.
    pub fn load(&mut self) -> AppResult<Vec<LoadReport>> {
        let started = Instant::now();

        let workers = self.loader.spawn_workers(self.loader_threads)?;
        let mut last_ready = usize::MAX;
        while !workers.is_settled() {
            let progress = self.loader.progress();
            if progress.ready != last_ready {
                log::info!(
                    "Loading: {}/{} ({:.0}%)",
                    progress.ready,
                    progress.total,
                    progress.fraction() * 100.0
                );
                last_ready = progress.ready;
            }
            std::thread::sleep(PROGRESS_INTERVAL);
        }
        let reports = workers.join()?;

        log::info!(
            "Loaded {} resources in {:.2}ms",
            self.registry.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        self.last_frame = Instant::now();
        Ok(reports)
    }

    /// Draw one frame.
    pub fn frame(&mut self) -> FrameReport {
        self.apply_display_changes();

        let now = Instant::now();
        let delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let report = self.graph.lock().draw(FrameContext::new(
            &mut self.backend,
            delta_time,
            self.frame_index,
        ));
        frame_mark!();
        self.frame_index += 1;
        report
    }

    /// Queue a display-mode change for the start of the next frame.
    ///
    /// Returns what will change; an empty set means the request matched the
    /// current mode and nothing was queued.
    pub fn request_display_mode(&mut self, settings: DisplaySettings) -> AppResult<DisplayChanges> {
        settings.validate().map_err(AppError::InvalidArgs)?;
        let changes = self.display.changes_to(&settings);
        if changes.is_empty() {
            self.pending_display = None;
        } else {
            log::debug!("Display change requested: {} -> {settings}", self.display);
            self.pending_display = Some(settings);
        }
        Ok(changes)
    }

    fn apply_display_changes(&mut self) {
        let Some(next) = self.pending_display.take() else {
            return;
        };
        let changes = self.display.changes_to(&next);
        if changes.contains(DisplayChanges::RESOLUTION) {
            self.backend.resize_back_buffer(next.back_buffer());
        }
        log::info!("Display mode {} -> {next} ({changes:?})", self.display);
        self.display = next;
    }

    /// Whether the frame limit has been reached.
    pub fn is_done(&self) -> bool {
        self.max_frames
            .is_some_and(|max_frames| self.frame_index >= max_frames)
    }

    /// Load, then draw until the frame limit (forever without one).
    pub fn run_frames(&mut self) -> AppResult<()> {
        self.load()?;
        log::info!("{}: rendering", self.title);

        while !self.is_done() {
            let started = Instant::now();
            let report = self.frame();
            if let Some((name, err)) = report.failed().next() {
                log::error!("Frame {}: pass \"{name}\" failed: {err}", report.frame_index());
            }
            if self.display.vsync {
                if let Some(rest) = VSYNC_INTERVAL.checked_sub(started.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }

        if let Some(max_frames) = self.max_frames {
            log::info!("Reached max frames limit ({max_frames}), exiting");
        }
        Ok(())
    }

    /// Stop audio and release every GPU object. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        log::info!("Shutting down after {} frame(s)", self.frame_index);

        if let Some(id) = self.ambient.take() {
            if let Some(source) = self.audio.sound_source(id) {
                source.stop();
            }
            self.audio.remove_sound_source(id);
        }

        let resource_manager = self.resource_manager.as_ref();
        self.graph.lock().release_resources(resource_manager);
        let freed = self.registry.free_all(resource_manager);
        log::info!("Freed {freed} resources");

        let live = self.resource_manager.live_objects();
        if live.total() > 0 {
            log::error!(
                "{} GPU object(s) leaked: {:?}",
                live.total(),
                self.resource_manager.live_labels()
            );
        }
        // A detached loader thread may still own a record it was creating.
        debug_assert!(
            live.total() == 0 || self.registry.busy() > 0,
            "GPU objects leaked at shutdown"
        );
    }

    /// Entry point: set up logging, run, shut down.
    pub fn run<A: AppArgs>(args: A) -> AppResult<()> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        gitech_core::init();
        gitech_graphics::init();
        crate::init();

        let mut app = Self::new(&args)?;
        let result = app.run_frames();
        app.shutdown();
        result
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn display_settings(&self) -> DisplaySettings {
        self.display
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn scene(&self) -> &SceneResources {
        &self.scene
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    pub fn loader(&self) -> &Arc<ConcurrentLoader> {
        &self.loader
    }

    pub fn graph_state(&self) -> GraphState {
        self.graph.lock().state()
    }

    pub fn backend(&self) -> &DummyBackend {
        &self.backend
    }

    pub fn resource_manager(&self) -> &Arc<DummyResourceManager> {
        &self.resource_manager
    }

    pub fn live_objects(&self) -> LiveObjects {
        self.resource_manager.live_objects()
    }

    pub fn audio(&self) -> &dyn AudioDevice {
        self.audio.as_ref()
    }

    pub fn ambient_source(&self) -> Option<SoundSourceId> {
        self.ambient
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("title", &self.title)
            .field("display", &self.display)
            .field("frame_index", &self.frame_index)
            .field("resources", &self.registry.len())
            .field("audio", &self.audio.name())
            .finish_non_exhaustive()
    }
}

fn start_ambient_sound(audio: &mut dyn AudioDevice) -> SoundSourceId {
    audio.set_listener_position([0.0, 1.7, 0.0]);
    audio.set_listener_orientation([0.0, 0.0, -1.0], [0.0, 1.0, 0.0]);

    let id = audio.create_sound_source();
    if let Some(source) = audio.sound_source(id) {
        source.set_sound_file(AMBIENT_SOUND);
        source.set_position([0.0, 2.0, 0.0]);
        source.play(true);
    }
    log::info!("Audio: {} device, ambient sound started", audio.name());
    id
}
