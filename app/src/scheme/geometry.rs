//! Passes that rasterize scene models.

use std::sync::Arc;

use gitech_graphics::backend::{ClearFlags, RenderTargetHandle, ShaderProgramHandle};
use gitech_graphics::pass::PassChildren;
use gitech_graphics::resource::{
    MaterialResource, MaterialSlot, ModelResource, RenderTargetResource, ShaderResource,
};
use gitech_graphics::{
    FrameContext, PassResult, RenderBackend, RenderPass, SkipReason, StateScope,
};

use super::common::ready;

/// Texture slots bound per mesh, in sampler order.
const MATERIAL_SLOTS: [MaterialSlot; 4] = [
    MaterialSlot::Diffuse,
    MaterialSlot::Normal,
    MaterialSlot::Specular,
    MaterialSlot::Roughness,
];

/// Draws every mesh of its models into one target with depth testing on.
///
/// With materials, mesh `i` samples material `i % materials.len()`. Without,
/// only depth and the shader's own outputs are written (shadow maps).
#[derive(Debug)]
pub struct GeometryPass {
    shader: Arc<ShaderResource>,
    output: Arc<RenderTargetResource>,
    models: Vec<Arc<ModelResource>>,
    materials: Vec<Arc<MaterialResource>>,
    clear: ClearFlags,
}

impl GeometryPass {
    pub fn new(shader: &Arc<ShaderResource>, output: &Arc<RenderTargetResource>) -> Self {
        Self {
            shader: Arc::clone(shader),
            output: Arc::clone(output),
            models: Vec::new(),
            materials: Vec::new(),
            clear: ClearFlags::empty(),
        }
    }

    pub fn model(mut self, model: &Arc<ModelResource>) -> Self {
        self.models.push(Arc::clone(model));
        self
    }

    pub fn materials(mut self, materials: &[Arc<MaterialResource>]) -> Self {
        self.materials.extend(materials.iter().cloned());
        self
    }

    pub fn clearing(mut self, clear: ClearFlags) -> Self {
        self.clear = clear;
        self
    }

    fn draw_models(
        &self,
        backend: &mut (dyn RenderBackend + '_),
        program: ShaderProgramHandle,
    ) -> PassResult {
        backend.bind_shader(program);
        for model in &self.models {
            let meshes = model.meshes();
            if meshes.is_empty() {
                return Err(SkipReason::ResourcesNotReady.into());
            }
            for (index, mesh) in meshes.iter().enumerate() {
                if !self.materials.is_empty() {
                    let material = &self.materials[index % self.materials.len()];
                    for (slot, kind) in MATERIAL_SLOTS.iter().enumerate() {
                        backend.set_texture(slot as u32, ready(material.texture(*kind))?);
                    }
                }
                backend.draw_vertex_buffer(mesh.vertices, Some(mesh.indices))?;
            }
        }
        Ok(())
    }

    fn draw_into(
        &self,
        backend: &mut (dyn RenderBackend + '_),
        program: ShaderProgramHandle,
        output: RenderTargetHandle,
    ) -> PassResult {
        let mut scope = StateScope::new(backend);
        scope.modify(|state| {
            state.blend_enabled = false;
            state.depth_test = true;
            state.depth_write = true;
        });
        scope.bind_render_target(output, self.clear)?;
        let drawn = self.draw_models(&mut *scope, program);
        scope.clear_inputs();
        scope.unbind_render_target(output);
        drawn
    }
}

impl RenderPass for GeometryPass {
    fn draw(&mut self, ctx: &mut FrameContext<'_>, _children: &mut PassChildren) -> PassResult {
        let program = ready(self.shader.program())?;
        let output = ready(self.output.target())?;
        self.draw_into(ctx.backend()?, program, output)
    }
}

