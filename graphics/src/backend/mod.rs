//! Rendering backend abstraction.
//!
//! The renderer talks to the GPU through two narrow traits:
//!
//! - [`ResourceManager`] creates and releases GPU objects. It is `Send + Sync`
//!   because resource loader workers call it concurrently.
//! - [`RenderBackend`] owns the device context used by the frame thread:
//!   binding, drawing, fixed-function state and debug markers.
//!
//! [`DummyBackend`] implements both without a GPU, for tests and headless runs.

#[cfg(feature = "dummy")]
mod dummy;
mod state;
mod types;

use std::sync::Arc;

#[cfg(feature = "dummy")]
pub use dummy::{BackendCommand, DummyBackend, DummyResourceManager, LiveObjects};
pub use state::StateScope;
pub use types::{
    BlendFactor, ClearFlags, CompareFunction, Extent2d, IndexBufferDescriptor, IndexBufferHandle,
    IndexFormat, PixelFormat, RenderState, RenderTargetDescriptor, RenderTargetHandle,
    ShaderProgramDescriptor, ShaderProgramHandle, TargetSize, TextureDescriptor, TextureHandle,
    VertexBufferDescriptor, VertexBufferHandle, VertexFormatDescriptor, VertexFormatHandle,
    VertexSemantic,
};

use crate::error::ResourceResult;

/// Creates and releases GPU objects.
///
/// Every `create_*` returns a handle (an index into the manager's tables).
/// Every `release_*` is idempotent: releasing an already-released handle
/// returns `false` and does nothing else.
pub trait ResourceManager: Send + Sync {
    /// Create a vertex format.
    fn create_vertex_format(
        &self,
        descriptor: &VertexFormatDescriptor,
    ) -> ResourceResult<VertexFormatHandle>;

    /// Create a vertex buffer.
    fn create_vertex_buffer(
        &self,
        descriptor: &VertexBufferDescriptor,
    ) -> ResourceResult<VertexBufferHandle>;

    /// Create an index buffer.
    fn create_index_buffer(
        &self,
        descriptor: &IndexBufferDescriptor,
    ) -> ResourceResult<IndexBufferHandle>;

    /// Compile and link a shader program.
    fn create_shader_program(
        &self,
        descriptor: &ShaderProgramDescriptor,
    ) -> ResourceResult<ShaderProgramHandle>;

    /// Create a sampled texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> ResourceResult<TextureHandle>;

    /// Create a render target.
    ///
    /// Targets with a [`TargetSize::Relative`] size are tracked by the manager
    /// and rebuilt by [`resize_dynamic_targets`](Self::resize_dynamic_targets).
    fn create_render_target(
        &self,
        descriptor: &RenderTargetDescriptor,
    ) -> ResourceResult<RenderTargetHandle>;

    fn release_vertex_format(&self, handle: VertexFormatHandle) -> bool;
    fn release_vertex_buffer(&self, handle: VertexBufferHandle) -> bool;
    fn release_index_buffer(&self, handle: IndexBufferHandle) -> bool;
    fn release_shader_program(&self, handle: ShaderProgramHandle) -> bool;
    fn release_texture(&self, handle: TextureHandle) -> bool;
    fn release_render_target(&self, handle: RenderTargetHandle) -> bool;

    /// Current pixel size of a live render target.
    fn render_target_size(&self, handle: RenderTargetHandle) -> Option<Extent2d>;

    /// Rebuild every back-buffer-relative render target for a new back-buffer
    /// size. Handles stay valid. Returns how many targets changed size.
    fn resize_dynamic_targets(&self, back_buffer: Extent2d) -> usize;
}

/// Device context used by the frame thread.
///
/// Not `Sync`: frame execution is single-threaded, and every call here
/// happens from within [`PassGraph::draw`](crate::pass::PassGraph::draw).
pub trait RenderBackend {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// The resource manager, if the device has one ready.
    fn resource_manager(&self) -> Option<Arc<dyn ResourceManager>>;

    /// Current back-buffer size.
    fn back_buffer_size(&self) -> Extent2d;

    /// Resize the back buffer and every relative render target with it.
    fn resize_back_buffer(&mut self, size: Extent2d);

    /// Direct output into a render target.
    fn bind_render_target(
        &mut self,
        target: RenderTargetHandle,
        clear: ClearFlags,
    ) -> ResourceResult<()>;

    /// Direct output into the back buffer.
    fn bind_back_buffer(&mut self, clear: ClearFlags);

    /// Stop directing output into `target`.
    fn unbind_render_target(&mut self, target: RenderTargetHandle);

    /// Sample a render target's color surface at `slot` in the next draws.
    fn set_input(&mut self, slot: u32, target: RenderTargetHandle);

    /// Sample a texture at `slot` in the next draws.
    fn set_texture(&mut self, slot: u32, texture: TextureHandle);

    /// Unbind every input slot.
    fn clear_inputs(&mut self);

    /// Use a shader program for the next draws.
    fn bind_shader(&mut self, program: ShaderProgramHandle);

    /// Draw a vertex buffer, optionally indexed.
    fn draw_vertex_buffer(
        &mut self,
        vertices: VertexBufferHandle,
        indices: Option<IndexBufferHandle>,
    ) -> ResourceResult<()>;

    /// Current fixed-function state.
    fn render_state(&self) -> RenderState;

    /// Replace the fixed-function state.
    fn set_render_state(&mut self, state: RenderState);

    /// Open a named debug marker region (GPU profiler / capture tools).
    fn push_marker(&mut self, name: &str);

    /// Close the innermost debug marker region.
    fn pop_marker(&mut self);
}
