//! Concrete resource payloads.
//!
//! Each payload keeps its descriptor and, once initialized, the handles the
//! resource manager returned. Passes hold `Arc`s to these and read the
//! handles at draw time; a `None` handle means the loader has not reached
//! the record yet.

use parking_lot::Mutex;

use crate::backend::{
    Extent2d, IndexBufferDescriptor, IndexBufferHandle, IndexFormat, PixelFormat,
    RenderTargetDescriptor, RenderTargetHandle, ResourceManager, ShaderProgramDescriptor,
    ShaderProgramHandle, TargetSize, TextureDescriptor, TextureHandle, VertexBufferDescriptor,
    VertexBufferHandle, VertexFormatDescriptor, VertexFormatHandle, VertexSemantic,
};
use crate::error::ResourceResult;

use super::record::{ResourceInit, ResourceKind};

// ============================================================================
// Shader
// ============================================================================

/// A vertex + pixel shader program.
#[derive(Debug)]
pub struct ShaderResource {
    descriptor: ShaderProgramDescriptor,
    program: Mutex<Option<ShaderProgramHandle>>,
}

impl ShaderResource {
    /// Declare a program from its two source files.
    pub fn new(vertex_source: impl Into<String>, pixel_source: impl Into<String>) -> Self {
        let vertex_source = vertex_source.into();
        let pixel_source = pixel_source.into();
        Self {
            descriptor: ShaderProgramDescriptor {
                label: format!("{vertex_source} + {pixel_source}"),
                vertex_source,
                pixel_source,
            },
            program: Mutex::new(None),
        }
    }

    /// The linked program, once initialized.
    pub fn program(&self) -> Option<ShaderProgramHandle> {
        *self.program.lock()
    }
}

impl ResourceInit for ShaderResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Shader
    }

    fn init(&self, resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        let program = resource_manager.create_shader_program(&self.descriptor)?;
        *self.program.lock() = Some(program);
        Ok(())
    }

    fn free(&self, resource_manager: &dyn ResourceManager) {
        if let Some(program) = self.program.lock().take() {
            resource_manager.release_shader_program(program);
        }
    }
}

// ============================================================================
// Texture
// ============================================================================

/// A sampled texture loaded from disk.
#[derive(Debug)]
pub struct TextureResource {
    descriptor: TextureDescriptor,
    texture: Mutex<Option<TextureHandle>>,
}

impl TextureResource {
    /// Declare a texture.
    pub fn new(path: impl Into<String>, size: Extent2d, format: PixelFormat) -> Self {
        Self::from_descriptor(TextureDescriptor {
            label: path.into(),
            size,
            format,
            mip_levels: full_mip_chain(size),
        })
    }

    /// Declare a texture from a full descriptor.
    pub fn from_descriptor(descriptor: TextureDescriptor) -> Self {
        Self {
            descriptor,
            texture: Mutex::new(None),
        }
    }

    /// The descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// The texture, once initialized.
    pub fn texture(&self) -> Option<TextureHandle> {
        *self.texture.lock()
    }
}

fn full_mip_chain(size: Extent2d) -> u32 {
    32 - size.width.max(size.height).max(1).leading_zeros()
}

impl ResourceInit for TextureResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Texture
    }

    fn init(&self, resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        let texture = resource_manager.create_texture(&self.descriptor)?;
        *self.texture.lock() = Some(texture);
        Ok(())
    }

    fn free(&self, resource_manager: &dyn ResourceManager) {
        if let Some(texture) = self.texture.lock().take() {
            resource_manager.release_texture(texture);
        }
    }
}

// ============================================================================
// Render target
// ============================================================================

/// A declared render target.
///
/// Relative targets are resized by the resource manager when the back buffer
/// changes; the handle stays the same.
#[derive(Debug)]
pub struct RenderTargetResource {
    descriptor: RenderTargetDescriptor,
    target: Mutex<Option<RenderTargetHandle>>,
}

impl RenderTargetResource {
    /// Declare a render target.
    pub fn new(descriptor: RenderTargetDescriptor) -> Self {
        Self {
            descriptor,
            target: Mutex::new(None),
        }
    }

    /// Declare a single-surface color target.
    pub fn color(label: impl Into<String>, size: TargetSize, format: PixelFormat) -> Self {
        Self::new(RenderTargetDescriptor::color(label, size, format))
    }

    /// The descriptor.
    pub fn descriptor(&self) -> &RenderTargetDescriptor {
        &self.descriptor
    }

    /// Whether the size follows the back buffer.
    pub fn is_dynamic(&self) -> bool {
        self.descriptor.size.is_relative()
    }

    /// The target, once initialized.
    pub fn target(&self) -> Option<RenderTargetHandle> {
        *self.target.lock()
    }
}

impl ResourceInit for RenderTargetResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::RenderTarget
    }

    fn init(&self, resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        let target = resource_manager.create_render_target(&self.descriptor)?;
        *self.target.lock() = Some(target);
        Ok(())
    }

    fn free(&self, resource_manager: &dyn ResourceManager) {
        if let Some(target) = self.target.lock().take() {
            resource_manager.release_render_target(target);
        }
    }
}

// ============================================================================
// Model
// ============================================================================

/// Vertex and index counts of one mesh in a model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshLayout {
    pub vertex_count: u32,
    pub index_count: u32,
}

/// GPU buffers of one mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffers {
    pub vertices: VertexBufferHandle,
    pub indices: IndexBufferHandle,
}

#[derive(Debug, Default)]
struct ModelBuffers {
    format: Option<VertexFormatHandle>,
    meshes: Vec<MeshBuffers>,
}

/// A model: one shared vertex format plus a vertex and index buffer per mesh.
#[derive(Debug)]
pub struct ModelResource {
    path: String,
    meshes: Vec<MeshLayout>,
    buffers: Mutex<ModelBuffers>,
}

impl ModelResource {
    /// Declare a model with the given mesh layout.
    pub fn new(path: impl Into<String>, meshes: impl Into<Vec<MeshLayout>>) -> Self {
        Self {
            path: path.into(),
            meshes: meshes.into(),
            buffers: Mutex::new(ModelBuffers::default()),
        }
    }

    /// Vertex layout used by every model.
    pub fn vertex_format() -> VertexFormatDescriptor {
        VertexFormatDescriptor::new([
            VertexSemantic::Position,
            VertexSemantic::TexCoord,
            VertexSemantic::Normal,
            VertexSemantic::Tangent,
            VertexSemantic::Binormal,
        ])
    }

    /// Model file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Per-mesh buffers, empty until initialized.
    pub fn meshes(&self) -> Vec<MeshBuffers> {
        self.buffers.lock().meshes.clone()
    }

    fn create_mesh(
        &self,
        resource_manager: &dyn ResourceManager,
        format: VertexFormatHandle,
        index: usize,
        layout: MeshLayout,
    ) -> ResourceResult<MeshBuffers> {
        let vertices = resource_manager.create_vertex_buffer(&VertexBufferDescriptor {
            label: format!("{} mesh {index} vertices", self.path),
            format,
            vertex_count: layout.vertex_count,
        })?;
        let indices = resource_manager.create_index_buffer(&IndexBufferDescriptor {
            label: format!("{} mesh {index} indices", self.path),
            format: if layout.vertex_count > u16::MAX as u32 {
                IndexFormat::U32
            } else {
                IndexFormat::U16
            },
            index_count: layout.index_count,
        });
        match indices {
            Ok(indices) => Ok(MeshBuffers { vertices, indices }),
            Err(err) => {
                resource_manager.release_vertex_buffer(vertices);
                Err(err)
            }
        }
    }
}

impl ResourceInit for ModelResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Model
    }

    fn init(&self, resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        let mut buffers = self.buffers.lock();
        let format = resource_manager.create_vertex_format(&Self::vertex_format())?;
        buffers.format = Some(format);
        for (index, layout) in self.meshes.iter().enumerate() {
            let mesh = self.create_mesh(resource_manager, format, index, *layout)?;
            buffers.meshes.push(mesh);
        }
        Ok(())
    }

    fn free(&self, resource_manager: &dyn ResourceManager) {
        let mut buffers = self.buffers.lock();
        for mesh in buffers.meshes.drain(..) {
            resource_manager.release_index_buffer(mesh.indices);
            resource_manager.release_vertex_buffer(mesh.vertices);
        }
        if let Some(format) = buffers.format.take() {
            resource_manager.release_vertex_format(format);
        }
    }
}

// ============================================================================
// Material
// ============================================================================

/// Texture slots of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialSlot {
    Diffuse,
    Normal,
    Specular,
    Roughness,
}

/// A material: a set of textures created together.
///
/// Materials own their textures rather than referencing other records, so a
/// material can be initialized by any loader thread in any order.
#[derive(Debug)]
pub struct MaterialResource {
    name: String,
    slots: Vec<(MaterialSlot, TextureDescriptor)>,
    textures: Mutex<Vec<(MaterialSlot, TextureHandle)>>,
}

impl MaterialResource {
    /// Declare an empty material.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            textures: Mutex::new(Vec::new()),
        }
    }

    /// Add a texture slot.
    pub fn with_texture(
        mut self,
        slot: MaterialSlot,
        path: impl Into<String>,
        size: Extent2d,
        format: PixelFormat,
    ) -> Self {
        self.slots.push((
            slot,
            TextureDescriptor {
                label: path.into(),
                size,
                format,
                mip_levels: full_mip_chain(size),
            },
        ));
        self
    }

    /// Material name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The texture bound to `slot`, once initialized.
    pub fn texture(&self, slot: MaterialSlot) -> Option<TextureHandle> {
        self.textures
            .lock()
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, texture)| *texture)
    }
}

impl ResourceInit for MaterialResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Material
    }

    fn init(&self, resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        let mut textures = self.textures.lock();
        for (slot, descriptor) in &self.slots {
            let texture = resource_manager.create_texture(descriptor)?;
            textures.push((*slot, texture));
        }
        Ok(())
    }

    fn free(&self, resource_manager: &dyn ResourceManager) {
        for (_, texture) in self.textures.lock().drain(..) {
            resource_manager.release_texture(texture);
        }
    }
}
