//! Building blocks shared by the scheme's passes.

use std::sync::Arc;

use gitech_graphics::backend::{
    BlendFactor, ClearFlags, IndexBufferDescriptor, IndexBufferHandle, IndexFormat,
    RenderTargetHandle, ShaderProgramHandle, TextureHandle, VertexBufferDescriptor,
    VertexBufferHandle, VertexFormatDescriptor, VertexFormatHandle, VertexSemantic,
};
use gitech_graphics::pass::PassChildren;
use gitech_graphics::{
    FrameContext, PassResult, RenderBackend, RenderPass, RenderState, ResourceManager,
    ResourceResult, SkipReason, StateScope,
};
use parking_lot::Mutex;

/// A handle that exists once its record is initialized.
pub(crate) fn ready<T>(handle: Option<T>) -> Result<T, SkipReason> {
    handle.ok_or(SkipReason::ResourcesNotReady)
}

/// Run `f` inside a named debug marker region. The region is closed even
/// when `f` fails.
pub(crate) fn with_marker<'b, R>(
    backend: &mut (dyn RenderBackend + 'b),
    name: &str,
    f: impl FnOnce(&mut (dyn RenderBackend + 'b)) -> R,
) -> R {
    backend.push_marker(name);
    let result = f(&mut *backend);
    backend.pop_marker();
    result
}

// ============================================================================
// Full-screen geometry
// ============================================================================

/// An over-sized triangle covering the whole viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullscreenTriangle {
    format: VertexFormatHandle,
    vertices: VertexBufferHandle,
    indices: IndexBufferHandle,
}

impl FullscreenTriangle {
    /// Create the vertex format, vertex buffer and index buffer.
    ///
    /// Nothing is left behind if any of the three fails.
    pub fn create(resource_manager: &dyn ResourceManager, label: &str) -> ResourceResult<Self> {
        let format = resource_manager
            .create_vertex_format(&VertexFormatDescriptor::new([VertexSemantic::Position]))?;

        let vertices = match resource_manager.create_vertex_buffer(&VertexBufferDescriptor {
            label: format!("{label} vertices"),
            format,
            vertex_count: 3,
        }) {
            Ok(vertices) => vertices,
            Err(err) => {
                resource_manager.release_vertex_format(format);
                return Err(err);
            }
        };

        let indices = match resource_manager.create_index_buffer(&IndexBufferDescriptor {
            label: format!("{label} indices"),
            format: IndexFormat::U16,
            index_count: 3,
        }) {
            Ok(indices) => indices,
            Err(err) => {
                resource_manager.release_vertex_buffer(vertices);
                resource_manager.release_vertex_format(format);
                return Err(err);
            }
        };

        Ok(Self {
            format,
            vertices,
            indices,
        })
    }

    pub fn release(self, resource_manager: &dyn ResourceManager) {
        resource_manager.release_index_buffer(self.indices);
        resource_manager.release_vertex_buffer(self.vertices);
        resource_manager.release_vertex_format(self.format);
    }
}

/// The triangle owned by the root pass and borrowed by every full-screen
/// leaf. Empty until the root allocates.
#[derive(Debug, Clone, Default)]
pub struct SharedTriangle(Arc<Mutex<Option<FullscreenTriangle>>>);

impl SharedTriangle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The triangle, or `ResourcesNotReady` before allocation.
    pub fn get(&self) -> Result<FullscreenTriangle, SkipReason> {
        ready(*self.0.lock())
    }

    fn replace(&self, triangle: Option<FullscreenTriangle>) -> Option<FullscreenTriangle> {
        std::mem::replace(&mut *self.0.lock(), triangle)
    }
}

// ============================================================================
// Draw submission
// ============================================================================

/// Color blending applied by a full-screen draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blend {
    #[default]
    Replace,
    /// `dst + src`, for light and glare accumulation.
    Additive,
    /// Standard alpha blending, for overlays.
    Alpha,
    /// `dst * src`, for occlusion.
    Multiply,
}

impl Blend {
    fn apply(self, state: &mut RenderState) {
        match self {
            Self::Replace => state.blend_enabled = false,
            Self::Additive => *state = state.additive(),
            Self::Alpha => {
                state.blend_enabled = true;
                state.src_blend = BlendFactor::SrcAlpha;
                state.dst_blend = BlendFactor::InvSrcAlpha;
            }
            Self::Multiply => {
                state.blend_enabled = true;
                state.src_blend = BlendFactor::Zero;
                state.dst_blend = BlendFactor::SrcColor;
            }
        }
    }
}

/// Where a resolved draw writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Target(RenderTargetHandle),
    BackBuffer,
}

/// One full-screen draw with every handle already resolved.
///
/// Render-target inputs occupy the first sampler slots, textures follow.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FullscreenDraw<'i> {
    program: ShaderProgramHandle,
    output: Output,
    inputs: &'i [RenderTargetHandle],
    textures: &'i [TextureHandle],
    clear: ClearFlags,
    blend: Blend,
}

impl<'i> FullscreenDraw<'i> {
    pub fn new(program: ShaderProgramHandle, output: Output) -> Self {
        Self {
            program,
            output,
            inputs: &[],
            textures: &[],
            clear: ClearFlags::empty(),
            blend: Blend::Replace,
        }
    }

    pub fn reading(mut self, inputs: &'i [RenderTargetHandle]) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn sampling(mut self, textures: &'i [TextureHandle]) -> Self {
        self.textures = textures;
        self
    }

    pub fn clearing(mut self, clear: ClearFlags) -> Self {
        self.clear = clear;
        self
    }

    pub fn blended(mut self, blend: Blend) -> Self {
        self.blend = blend;
        self
    }

    /// Bind, draw and unbind. Render state is restored afterwards.
    pub fn submit(
        &self,
        backend: &mut (dyn RenderBackend + '_),
        triangle: &FullscreenTriangle,
    ) -> ResourceResult<()> {
        let mut scope = StateScope::new(backend);
        scope.modify(|state| {
            *state = state.fullscreen();
            self.blend.apply(state);
        });

        match self.output {
            Output::Target(target) => scope.bind_render_target(target, self.clear)?,
            Output::BackBuffer => scope.bind_back_buffer(self.clear),
        }
        scope.bind_shader(self.program);
        for (slot, input) in self.inputs.iter().enumerate() {
            scope.set_input(slot as u32, *input);
        }
        let first_texture = self.inputs.len() as u32;
        for (slot, texture) in self.textures.iter().enumerate() {
            scope.set_texture(first_texture + slot as u32, *texture);
        }

        let drawn = scope.draw_vertex_buffer(triangle.vertices, Some(triangle.indices));
        scope.clear_inputs();
        if let Output::Target(target) = self.output {
            scope.unbind_render_target(target);
        }
        drawn
    }
}

// ============================================================================
// Structural passes
// ============================================================================

/// Root of the scheme: clears the back buffer and owns the shared triangle.
#[derive(Debug)]
pub struct FramePass {
    triangle: SharedTriangle,
}

impl FramePass {
    pub fn new(triangle: SharedTriangle) -> Self {
        Self { triangle }
    }
}

impl RenderPass for FramePass {
    fn draw(&mut self, ctx: &mut FrameContext<'_>, children: &mut PassChildren) -> PassResult {
        ctx.resources()?;
        ctx.backend()?
            .bind_back_buffer(ClearFlags::COLOR | ClearFlags::DEPTH | ClearFlags::STENCIL);
        children.draw(ctx);
        Ok(())
    }

    fn allocate_resources(&mut self, resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        let triangle = FullscreenTriangle::create(resource_manager, "Full-screen triangle")?;
        if let Some(stale) = self.triangle.replace(Some(triangle)) {
            stale.release(resource_manager);
        }
        Ok(())
    }

    fn release_resources(&mut self, resource_manager: &dyn ResourceManager) {
        if let Some(triangle) = self.triangle.replace(None) {
            triangle.release(resource_manager);
        }
    }
}

/// A group that can be switched off as a whole.
#[derive(Debug, Clone, Copy)]
pub struct TogglePass {
    enabled: bool,
}

impl TogglePass {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl RenderPass for TogglePass {
    fn draw(&mut self, ctx: &mut FrameContext<'_>, children: &mut PassChildren) -> PassResult {
        if !self.enabled {
            return Err(SkipReason::Disabled.into());
        }
        children.draw(ctx);
        Ok(())
    }
}
