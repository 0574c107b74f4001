//! Dummy backend for tests and headless runs.
//!
//! No GPU work happens here. [`DummyResourceManager`] keeps descriptors in
//! [`SlotTable`]s so tests can count live objects and check that teardown
//! released everything. [`DummyBackend`] tracks binding and marker state and
//! can optionally record every call as a [`BackendCommand`].

use std::sync::Arc;

use gitech_core::slots::SlotTable;
use parking_lot::Mutex;

use crate::error::{ResourceError, ResourceResult};

use super::{
    ClearFlags, Extent2d, IndexBufferDescriptor, IndexBufferHandle, RenderBackend, RenderState,
    RenderTargetDescriptor, RenderTargetHandle, ResourceManager, ShaderProgramDescriptor,
    ShaderProgramHandle, TextureDescriptor, TextureHandle, VertexBufferDescriptor,
    VertexBufferHandle, VertexFormatDescriptor, VertexFormatHandle,
};

/// Live object counts per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveObjects {
    pub vertex_formats: usize,
    pub vertex_buffers: usize,
    pub index_buffers: usize,
    pub shader_programs: usize,
    pub textures: usize,
    pub render_targets: usize,
}

impl LiveObjects {
    /// Sum over all kinds.
    pub fn total(&self) -> usize {
        self.vertex_formats
            + self.vertex_buffers
            + self.index_buffers
            + self.shader_programs
            + self.textures
            + self.render_targets
    }
}

#[derive(Debug)]
struct DummyRenderTarget {
    descriptor: RenderTargetDescriptor,
    realized: Extent2d,
}

#[derive(Debug, Default)]
struct DummyTables {
    back_buffer: Extent2d,
    vertex_formats: SlotTable<VertexFormatDescriptor>,
    vertex_buffers: SlotTable<VertexBufferDescriptor>,
    index_buffers: SlotTable<IndexBufferDescriptor>,
    shader_programs: SlotTable<ShaderProgramDescriptor>,
    textures: SlotTable<TextureDescriptor>,
    render_targets: SlotTable<DummyRenderTarget>,
}

/// In-memory resource manager.
#[derive(Debug)]
pub struct DummyResourceManager {
    tables: Mutex<DummyTables>,
}

impl DummyResourceManager {
    /// Create a manager whose relative targets resolve against `back_buffer`.
    pub fn new(back_buffer: Extent2d) -> Self {
        Self {
            tables: Mutex::new(DummyTables {
                back_buffer,
                ..Default::default()
            }),
        }
    }

    /// Current live object counts.
    pub fn live_objects(&self) -> LiveObjects {
        let tables = self.tables.lock();
        LiveObjects {
            vertex_formats: tables.vertex_formats.live(),
            vertex_buffers: tables.vertex_buffers.live(),
            index_buffers: tables.index_buffers.live(),
            shader_programs: tables.shader_programs.live(),
            textures: tables.textures.live(),
            render_targets: tables.render_targets.live(),
        }
    }

    /// Label of a live render target.
    pub fn render_target_label(&self, handle: RenderTargetHandle) -> Option<String> {
        let tables = self.tables.lock();
        tables
            .render_targets
            .get(handle.index())
            .map(|target| target.descriptor.label.clone())
    }

    /// Labels of every live object, for leak reports.
    pub fn live_labels(&self) -> Vec<String> {
        let tables = self.tables.lock();
        let mut labels = Vec::new();
        labels.extend(tables.vertex_buffers.iter().map(|(_, d)| d.label.clone()));
        labels.extend(tables.index_buffers.iter().map(|(_, d)| d.label.clone()));
        labels.extend(tables.shader_programs.iter().map(|(_, d)| d.label.clone()));
        labels.extend(tables.textures.iter().map(|(_, d)| d.label.clone()));
        labels.extend(
            tables
                .render_targets
                .iter()
                .map(|(_, t)| t.descriptor.label.clone()),
        );
        labels.extend(
            tables
                .vertex_formats
                .iter()
                .map(|(i, _)| format!("vertex format {i}")),
        );
        labels
    }
}

impl Default for DummyResourceManager {
    fn default() -> Self {
        Self::new(Extent2d::new(1280, 720))
    }
}

impl ResourceManager for DummyResourceManager {
    fn create_vertex_format(
        &self,
        descriptor: &VertexFormatDescriptor,
    ) -> ResourceResult<VertexFormatHandle> {
        if descriptor.attributes.is_empty() {
            return Err(ResourceError::CreationFailed {
                kind: "vertex format",
                reason: "no attributes".into(),
            });
        }
        let index = self.tables.lock().vertex_formats.insert(descriptor.clone());
        log::trace!(
            "DummyResourceManager: creating vertex format {index} (stride: {})",
            descriptor.stride()
        );
        Ok(VertexFormatHandle::from_raw(index))
    }

    fn create_vertex_buffer(
        &self,
        descriptor: &VertexBufferDescriptor,
    ) -> ResourceResult<VertexBufferHandle> {
        let mut tables = self.tables.lock();
        if tables.vertex_formats.get(descriptor.format.index()).is_none() {
            return Err(ResourceError::InvalidHandle {
                kind: "vertex format",
                index: descriptor.format.index(),
            });
        }
        log::trace!(
            "DummyResourceManager: creating vertex buffer {:?} ({} vertices)",
            descriptor.label,
            descriptor.vertex_count
        );
        let index = tables.vertex_buffers.insert(descriptor.clone());
        Ok(VertexBufferHandle::from_raw(index))
    }

    fn create_index_buffer(
        &self,
        descriptor: &IndexBufferDescriptor,
    ) -> ResourceResult<IndexBufferHandle> {
        log::trace!(
            "DummyResourceManager: creating index buffer {:?} ({} indices)",
            descriptor.label,
            descriptor.index_count
        );
        let index = self.tables.lock().index_buffers.insert(descriptor.clone());
        Ok(IndexBufferHandle::from_raw(index))
    }

    fn create_shader_program(
        &self,
        descriptor: &ShaderProgramDescriptor,
    ) -> ResourceResult<ShaderProgramHandle> {
        log::trace!(
            "DummyResourceManager: creating shader program {:?} ({} + {})",
            descriptor.label,
            descriptor.vertex_source,
            descriptor.pixel_source
        );
        let index = self.tables.lock().shader_programs.insert(descriptor.clone());
        Ok(ShaderProgramHandle::from_raw(index))
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> ResourceResult<TextureHandle> {
        if descriptor.size.is_empty() {
            return Err(ResourceError::CreationFailed {
                kind: "texture",
                reason: format!("zero extent {}", descriptor.size),
            });
        }
        if descriptor.format.is_depth() {
            return Err(ResourceError::UnsupportedFormat(format!(
                "{:?} cannot be sampled as a texture",
                descriptor.format
            )));
        }
        log::trace!(
            "DummyResourceManager: creating texture {:?} ({}, {:?})",
            descriptor.label,
            descriptor.size,
            descriptor.format
        );
        let index = self.tables.lock().textures.insert(descriptor.clone());
        Ok(TextureHandle::from_raw(index))
    }

    fn create_render_target(
        &self,
        descriptor: &RenderTargetDescriptor,
    ) -> ResourceResult<RenderTargetHandle> {
        if let Some(format) = descriptor.color_formats.iter().find(|f| f.is_depth()) {
            return Err(ResourceError::UnsupportedFormat(format!(
                "{format:?} used as a color surface"
            )));
        }
        if let Some(format) = descriptor.depth_format.filter(|f| !f.is_depth()) {
            return Err(ResourceError::UnsupportedFormat(format!(
                "{format:?} used as a depth surface"
            )));
        }
        let mut tables = self.tables.lock();
        let realized = descriptor.size.resolve(tables.back_buffer);
        log::trace!(
            "DummyResourceManager: creating render target {:?} ({realized})",
            descriptor.label
        );
        let index = tables.render_targets.insert(DummyRenderTarget {
            descriptor: descriptor.clone(),
            realized,
        });
        Ok(RenderTargetHandle::from_raw(index))
    }

    fn release_vertex_format(&self, handle: VertexFormatHandle) -> bool {
        self.tables
            .lock()
            .vertex_formats
            .remove(handle.index())
            .is_some()
    }

    fn release_vertex_buffer(&self, handle: VertexBufferHandle) -> bool {
        self.tables
            .lock()
            .vertex_buffers
            .remove(handle.index())
            .is_some()
    }

    fn release_index_buffer(&self, handle: IndexBufferHandle) -> bool {
        self.tables
            .lock()
            .index_buffers
            .remove(handle.index())
            .is_some()
    }

    fn release_shader_program(&self, handle: ShaderProgramHandle) -> bool {
        self.tables
            .lock()
            .shader_programs
            .remove(handle.index())
            .is_some()
    }

    fn release_texture(&self, handle: TextureHandle) -> bool {
        self.tables.lock().textures.remove(handle.index()).is_some()
    }

    fn release_render_target(&self, handle: RenderTargetHandle) -> bool {
        self.tables
            .lock()
            .render_targets
            .remove(handle.index())
            .is_some()
    }

    fn render_target_size(&self, handle: RenderTargetHandle) -> Option<Extent2d> {
        self.tables
            .lock()
            .render_targets
            .get(handle.index())
            .map(|target| target.realized)
    }

    fn resize_dynamic_targets(&self, back_buffer: Extent2d) -> usize {
        let mut tables = self.tables.lock();
        tables.back_buffer = back_buffer;
        let mut resized = 0;
        for (_, target) in tables.render_targets.iter_mut() {
            let size = target.descriptor.size.resolve(back_buffer);
            if target.descriptor.size.is_relative() && size != target.realized {
                log::trace!(
                    "DummyResourceManager: recreating {:?} at {size}",
                    target.descriptor.label
                );
                target.realized = size;
                resized += 1;
            }
        }
        resized
    }
}

/// A call made on a [`DummyBackend`] while command recording is enabled.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    PushMarker(String),
    PopMarker,
    BindTarget(RenderTargetHandle, ClearFlags),
    BindBackBuffer(ClearFlags),
    UnbindTarget(RenderTargetHandle),
    SetInput(u32, RenderTargetHandle),
    SetTexture(u32, TextureHandle),
    ClearInputs,
    BindShader(ShaderProgramHandle),
    Draw {
        vertices: VertexBufferHandle,
        indices: Option<IndexBufferHandle>,
        output: Option<RenderTargetHandle>,
        inputs: Vec<RenderTargetHandle>,
    },
    SetState(RenderState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    BackBuffer,
    Target(RenderTargetHandle),
}

/// Headless render backend.
#[derive(Debug)]
pub struct DummyBackend {
    resource_manager: Option<Arc<DummyResourceManager>>,
    back_buffer: Extent2d,
    state: RenderState,
    output: Option<Output>,
    inputs: Vec<(u32, RenderTargetHandle)>,
    shader: Option<ShaderProgramHandle>,
    markers: Vec<String>,
    max_marker_depth: usize,
    draw_calls: u64,
    aliasing_violations: u64,
    commands: Option<Vec<BackendCommand>>,
}

impl DummyBackend {
    /// Create a backend with its own resource manager.
    pub fn new(back_buffer: Extent2d) -> Self {
        Self::with_resource_manager(Arc::new(DummyResourceManager::new(back_buffer)))
    }

    /// Create a backend around an existing resource manager.
    ///
    /// The back-buffer size is taken from the manager.
    pub fn with_resource_manager(resource_manager: Arc<DummyResourceManager>) -> Self {
        let back_buffer = resource_manager.tables.lock().back_buffer;
        let mut backend = Self::without_resource_manager(back_buffer);
        backend.resource_manager = Some(resource_manager);
        backend
    }

    /// Create a backend whose resource manager is not available, so every
    /// pass that needs one skips.
    pub fn without_resource_manager(back_buffer: Extent2d) -> Self {
        Self {
            resource_manager: None,
            back_buffer,
            state: RenderState::default(),
            output: None,
            inputs: Vec::new(),
            shader: None,
            markers: Vec::new(),
            max_marker_depth: 0,
            draw_calls: 0,
            aliasing_violations: 0,
            commands: None,
        }
    }

    /// Start recording every call into a command log.
    pub fn with_command_log(mut self) -> Self {
        self.commands = Some(Vec::new());
        self
    }

    /// The concrete resource manager.
    pub fn dummy_resource_manager(&self) -> Option<&Arc<DummyResourceManager>> {
        self.resource_manager.as_ref()
    }

    /// Recorded commands (empty unless recording is enabled).
    pub fn commands(&self) -> &[BackendCommand] {
        self.commands.as_deref().unwrap_or(&[])
    }

    /// Drain the recorded commands.
    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        self.commands.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Currently open marker regions, outermost first.
    pub fn marker_stack(&self) -> &[String] {
        &self.markers
    }

    /// Deepest marker nesting seen so far.
    pub fn max_marker_depth(&self) -> usize {
        self.max_marker_depth
    }

    /// Number of draw calls issued.
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Draws that sampled the render target they were writing to.
    pub fn aliasing_violations(&self) -> u64 {
        self.aliasing_violations
    }

    fn record(&mut self, command: impl FnOnce() -> BackendCommand) {
        if let Some(commands) = self.commands.as_mut() {
            commands.push(command());
        }
    }
}

impl RenderBackend for DummyBackend {
    fn name(&self) -> &str {
        "Dummy"
    }

    fn resource_manager(&self) -> Option<Arc<dyn ResourceManager>> {
        self.resource_manager
            .clone()
            .map(|rm| rm as Arc<dyn ResourceManager>)
    }

    fn back_buffer_size(&self) -> Extent2d {
        self.back_buffer
    }

    fn resize_back_buffer(&mut self, size: Extent2d) {
        log::debug!("DummyBackend: back buffer {} -> {size}", self.back_buffer);
        self.back_buffer = size;
        if let Some(rm) = &self.resource_manager {
            rm.resize_dynamic_targets(size);
        }
    }

    fn bind_render_target(
        &mut self,
        target: RenderTargetHandle,
        clear: ClearFlags,
    ) -> ResourceResult<()> {
        let live = self
            .resource_manager
            .as_ref()
            .is_some_and(|rm| rm.render_target_size(target).is_some());
        if !live {
            return Err(ResourceError::InvalidHandle {
                kind: "render target",
                index: target.index(),
            });
        }
        self.output = Some(Output::Target(target));
        self.record(|| BackendCommand::BindTarget(target, clear));
        Ok(())
    }

    fn bind_back_buffer(&mut self, clear: ClearFlags) {
        self.output = Some(Output::BackBuffer);
        self.record(|| BackendCommand::BindBackBuffer(clear));
    }

    fn unbind_render_target(&mut self, target: RenderTargetHandle) {
        if self.output == Some(Output::Target(target)) {
            self.output = None;
        }
        self.record(|| BackendCommand::UnbindTarget(target));
    }

    fn set_input(&mut self, slot: u32, target: RenderTargetHandle) {
        self.inputs.retain(|(s, _)| *s != slot);
        self.inputs.push((slot, target));
        self.record(|| BackendCommand::SetInput(slot, target));
    }

    fn set_texture(&mut self, slot: u32, texture: TextureHandle) {
        self.inputs.retain(|(s, _)| *s != slot);
        self.record(|| BackendCommand::SetTexture(slot, texture));
    }

    fn clear_inputs(&mut self) {
        self.inputs.clear();
        self.record(|| BackendCommand::ClearInputs);
    }

    fn bind_shader(&mut self, program: ShaderProgramHandle) {
        self.shader = Some(program);
        self.record(|| BackendCommand::BindShader(program));
    }

    fn draw_vertex_buffer(
        &mut self,
        vertices: VertexBufferHandle,
        indices: Option<IndexBufferHandle>,
    ) -> ResourceResult<()> {
        let output = match self.output {
            Some(Output::Target(target)) => Some(target),
            Some(Output::BackBuffer) => None,
            None => {
                return Err(ResourceError::CreationFailed {
                    kind: "draw call",
                    reason: "no output bound".into(),
                });
            }
        };
        if let Some(target) = output
            && self.inputs.iter().any(|(_, input)| *input == target)
        {
            log::error!(
                "DummyBackend: render target {} bound as both input and output",
                target.index()
            );
            self.aliasing_violations += 1;
        }
        self.draw_calls += 1;
        let inputs: Vec<_> = self.inputs.iter().map(|(_, t)| *t).collect();
        self.record(|| BackendCommand::Draw {
            vertices,
            indices,
            output,
            inputs,
        });
        Ok(())
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn set_render_state(&mut self, state: RenderState) {
        self.state = state;
        self.record(|| BackendCommand::SetState(state));
    }

    fn push_marker(&mut self, name: &str) {
        self.markers.push(name.to_owned());
        self.max_marker_depth = self.max_marker_depth.max(self.markers.len());
        self.record(|| BackendCommand::PushMarker(name.to_owned()));
    }

    fn pop_marker(&mut self) {
        let popped = self.markers.pop();
        debug_assert!(popped.is_some(), "profile marker stack underflow");
        self.record(|| BackendCommand::PopMarker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{PixelFormat, TargetSize};

    fn target(label: &str, size: TargetSize) -> RenderTargetDescriptor {
        RenderTargetDescriptor::color(label, size, PixelFormat::Rgba16Float)
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new(Extent2d::new(800, 600));
        assert_eq!(backend.name(), "Dummy");
        assert!(backend.resource_manager().is_some());
        assert!(
            DummyBackend::without_resource_manager(Extent2d::new(1, 1))
                .resource_manager()
                .is_none()
        );
    }

    #[test]
    fn test_release_is_idempotent() {
        let rm = DummyResourceManager::default();
        let handle = rm
            .create_render_target(&target("hdr", TargetSize::full_resolution()))
            .unwrap();
        assert_eq!(rm.live_objects().render_targets, 1);
        assert!(rm.release_render_target(handle));
        assert!(!rm.release_render_target(handle));
        assert_eq!(rm.live_objects().total(), 0);
    }

    #[test]
    fn test_relative_targets_follow_back_buffer() {
        let rm = DummyResourceManager::new(Extent2d::new(1280, 720));
        let half = rm
            .create_render_target(&target("half", TargetSize::relative(0.5, 0.5)))
            .unwrap();
        let fixed = rm
            .create_render_target(&target("fixed", TargetSize::fixed(64, 64)))
            .unwrap();

        assert_eq!(rm.resize_dynamic_targets(Extent2d::new(1920, 1080)), 1);
        assert_eq!(rm.render_target_size(half), Some(Extent2d::new(960, 540)));
        assert_eq!(rm.render_target_size(fixed), Some(Extent2d::new(64, 64)));
        assert_eq!(rm.resize_dynamic_targets(Extent2d::new(1920, 1080)), 0);
    }

    #[test]
    fn test_depth_format_rejected_as_color() {
        let rm = DummyResourceManager::default();
        let result = rm.create_render_target(&RenderTargetDescriptor::color(
            "bad",
            TargetSize::fixed(4, 4),
            PixelFormat::Depth32Float,
        ));
        assert!(matches!(result, Err(ResourceError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_aliasing_draw_is_detected() {
        let mut backend = DummyBackend::new(Extent2d::new(128, 128)).with_command_log();
        let rm = backend.resource_manager().unwrap();
        let format = rm
            .create_vertex_format(&VertexFormatDescriptor::position_texcoord())
            .unwrap();
        let triangle = rm
            .create_vertex_buffer(&VertexBufferDescriptor {
                label: "triangle".into(),
                format,
                vertex_count: 3,
            })
            .unwrap();
        let rt = rm
            .create_render_target(&target("rt", TargetSize::full_resolution()))
            .unwrap();

        backend.bind_render_target(rt, ClearFlags::COLOR).unwrap();
        backend.set_input(0, rt);
        backend.draw_vertex_buffer(triangle, None).unwrap();

        assert_eq!(backend.aliasing_violations(), 1);
        assert_eq!(backend.draw_calls(), 1);
        assert!(matches!(
            backend.commands().last(),
            Some(BackendCommand::Draw { output: Some(_), .. })
        ));
    }

    #[test]
    fn test_draw_without_output_fails() {
        let mut backend = DummyBackend::new(Extent2d::new(16, 16));
        let result = backend.draw_vertex_buffer(VertexBufferHandle::from_raw(0), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_marker_stack() {
        let mut backend = DummyBackend::new(Extent2d::new(16, 16));
        backend.push_marker("Frame");
        backend.push_marker("Bloom");
        assert_eq!(backend.marker_stack(), ["Frame", "Bloom"]);
        backend.pop_marker();
        backend.pop_marker();
        assert!(backend.marker_stack().is_empty());
        assert_eq!(backend.max_marker_depth(), 2);
    }
}
