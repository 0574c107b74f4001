//! Common utilities for loader and pass-tree integration tests.
//!
//! Provides instrumented [`ResourceInit`] payloads that count and time their
//! own initialization, and a recording [`RenderPass`] that logs every hook
//! call in order.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use gitech_graphics::backend::{ClearFlags, PixelFormat, RenderTargetHandle, TargetSize};
use gitech_graphics::pass::{FrameContext, PassChildren, PassResult, RenderPass};
use gitech_graphics::resource::{RenderTargetResource, ResourceInit, ResourceKind, ResourceRegistry};
use gitech_graphics::{ResourceError, ResourceManager, ResourceResult};
use parking_lot::Mutex;

/// Install a test logger once; later calls are ignored.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Instrumented resources
// ============================================================================

/// Counters shared by every [`InstrumentedResource`] of one registry.
#[derive(Debug, Default)]
pub struct InstrumentedStats {
    in_init: AtomicUsize,
    max_in_init: AtomicUsize,
    pub total_inits: AtomicUsize,
}

impl InstrumentedStats {
    /// Highest number of threads seen inside any `init` at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_in_init.load(Ordering::SeqCst)
    }
}

/// A resource that counts its own `init` calls and can be made slow, stuck
/// or failing.
#[derive(Debug)]
pub struct InstrumentedResource {
    pub inits: AtomicUsize,
    in_init: AtomicUsize,
    max_in_init: AtomicUsize,
    stats: Arc<InstrumentedStats>,
    work: Duration,
    gate: Option<Arc<AtomicBool>>,
    fail: bool,
}

impl InstrumentedResource {
    pub fn new(stats: Arc<InstrumentedStats>) -> Self {
        Self {
            inits: AtomicUsize::new(0),
            in_init: AtomicUsize::new(0),
            max_in_init: AtomicUsize::new(0),
            stats,
            work: Duration::ZERO,
            gate: None,
            fail: false,
        }
    }

    /// Sleep this long inside `init`.
    pub fn with_work(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    /// Block inside `init` until `gate` is set.
    pub fn stuck_until(mut self, gate: Arc<AtomicBool>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Fail every `init`.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    /// Highest number of threads seen inside this record's `init` at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_in_init.load(Ordering::SeqCst)
    }
}

impl ResourceInit for InstrumentedResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Texture
    }

    fn init(&self, _resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        let inside = self.in_init.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_init.fetch_max(inside, Ordering::SeqCst);
        let global = self.stats.in_init.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_init.fetch_max(global, Ordering::SeqCst);

        self.inits.fetch_add(1, Ordering::SeqCst);
        self.stats.total_inits.fetch_add(1, Ordering::SeqCst);
        if !self.work.is_zero() {
            std::thread::sleep(self.work);
        }
        if let Some(gate) = &self.gate {
            while !gate.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
        }

        self.stats.in_init.fetch_sub(1, Ordering::SeqCst);
        self.in_init.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            Err(ResourceError::Init("resource configured to fail".into()))
        } else {
            Ok(())
        }
    }

    fn free(&self, _resource_manager: &dyn ResourceManager) {}
}

/// A registry of `count` resources named `resource #i`.
///
/// `configure` may alter each resource before it is registered.
pub fn instrumented_registry(
    count: usize,
    mut configure: impl FnMut(usize, InstrumentedResource) -> InstrumentedResource,
) -> (Arc<ResourceRegistry>, Vec<Arc<InstrumentedResource>>, Arc<InstrumentedStats>) {
    let stats = Arc::new(InstrumentedStats::default());
    let mut builder = ResourceRegistry::builder();
    let resources = (0..count)
        .map(|i| {
            let resource = configure(i, InstrumentedResource::new(Arc::clone(&stats)));
            builder.register(format!("resource #{i}"), resource)
        })
        .collect();
    (Arc::new(builder.build()), resources, stats)
}

/// A registry mixing resources with a real render target, so the dummy
/// resource manager also sees traffic.
pub fn mixed_registry(count: usize) -> (Arc<ResourceRegistry>, Arc<RenderTargetResource>) {
    let stats = Arc::new(InstrumentedStats::default());
    let mut builder = ResourceRegistry::builder();
    for i in 0..count {
        builder.register(format!("resource #{i}"), InstrumentedResource::new(Arc::clone(&stats)));
    }
    let target = builder.register(
        "HDR light accumulation",
        RenderTargetResource::color(
            "HDR light accumulation",
            TargetSize::full_resolution(),
            PixelFormat::Rgba16Float,
        ),
    );
    (Arc::new(builder.build()), target)
}

// ============================================================================
// Recording passes
// ============================================================================

/// Shared, ordered log of hook calls.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A pass that logs `update:<name>`, `draw:<name>`, `allocate:<name>` and
/// `release:<name>`, and optionally draws into a render target.
pub struct RecordingPass {
    name: String,
    log: CallLog,
    target: Option<RenderTargetHandle>,
    needs_resources: bool,
}

impl RecordingPass {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_owned(),
            log: Arc::clone(log),
            target: None,
            needs_resources: false,
        }
    }

    /// Skip unless the backend has a resource manager.
    pub fn needing_resources(mut self) -> Self {
        self.needs_resources = true;
        self
    }

    fn push(&self, hook: &str) {
        self.log.lock().push(format!("{hook}:{}", self.name));
    }
}

impl RenderPass for RecordingPass {
    fn update(&mut self, _delta_time: f32) {
        self.push("update");
    }

    fn draw(&mut self, ctx: &mut FrameContext<'_>, children: &mut PassChildren) -> PassResult {
        self.push("draw");
        if self.needs_resources {
            ctx.resources()?;
        }
        if let Some(target) = self.target {
            ctx.backend()?
                .bind_render_target(target, ClearFlags::COLOR)?;
        }
        children.draw(ctx);
        if let Some(target) = self.target {
            ctx.backend()?.unbind_render_target(target);
        }
        Ok(())
    }

    fn allocate_resources(&mut self, resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        self.push("allocate");
        let descriptor = gitech_graphics::backend::RenderTargetDescriptor::color(
            self.name.clone(),
            TargetSize::full_resolution(),
            PixelFormat::Rgba8Unorm,
        );
        self.target = Some(resource_manager.create_render_target(&descriptor)?);
        Ok(())
    }

    fn release_resources(&mut self, resource_manager: &dyn ResourceManager) {
        self.push("release");
        if let Some(target) = self.target.take() {
            resource_manager.release_render_target(target);
        }
    }
}
