//! Full-screen passes: one or two triangle draws from declared inputs into a
//! declared output.

use std::sync::Arc;

use gitech_graphics::backend::ClearFlags;
use gitech_graphics::pass::PassChildren;
use gitech_graphics::resource::{RenderTargetResource, ShaderResource, TextureResource};
use gitech_graphics::{
    FrameContext, PassResult, RenderPass, ResourceManager, ResourceResult, SkipReason,
};

use super::common::{
    Blend, FullscreenDraw, FullscreenTriangle, Output, SharedTriangle, ready,
};

/// Where a [`FullscreenPass`] writes.
#[derive(Debug, Clone)]
pub enum PassOutput {
    Target(Arc<RenderTargetResource>),
    BackBuffer,
}

impl PassOutput {
    fn resolve(&self) -> Result<Output, SkipReason> {
        match self {
            Self::Target(target) => Ok(Output::Target(ready(target.target())?)),
            Self::BackBuffer => Ok(Output::BackBuffer),
        }
    }
}

/// Samples its inputs with one shader and writes one output.
#[derive(Debug, Clone)]
pub struct FullscreenPass {
    triangle: SharedTriangle,
    shader: Arc<ShaderResource>,
    output: PassOutput,
    inputs: Vec<Arc<RenderTargetResource>>,
    textures: Vec<Arc<TextureResource>>,
    clear: ClearFlags,
    blend: Blend,
    enabled: bool,
}

impl FullscreenPass {
    pub fn new(triangle: &SharedTriangle, shader: &Arc<ShaderResource>, output: PassOutput) -> Self {
        Self {
            triangle: triangle.clone(),
            shader: Arc::clone(shader),
            output,
            inputs: Vec::new(),
            textures: Vec::new(),
            clear: ClearFlags::empty(),
            blend: Blend::Replace,
            enabled: true,
        }
    }

    /// Write into a declared target.
    pub fn into_target(
        triangle: &SharedTriangle,
        shader: &Arc<ShaderResource>,
        output: &Arc<RenderTargetResource>,
    ) -> Self {
        Self::new(triangle, shader, PassOutput::Target(Arc::clone(output)))
    }

    pub fn reading(mut self, input: &Arc<RenderTargetResource>) -> Self {
        self.inputs.push(Arc::clone(input));
        self
    }

    pub fn sampling(mut self, texture: &Arc<TextureResource>) -> Self {
        self.textures.push(Arc::clone(texture));
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

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Resolve every handle and submit the draw.
    pub(crate) fn run(&self, ctx: &mut FrameContext<'_>) -> PassResult {
        if !self.enabled {
            return Err(SkipReason::Disabled.into());
        }
        let triangle = self.triangle.get()?;
        let program = ready(self.shader.program())?;
        let output = self.output.resolve()?;
        let inputs = self
            .inputs
            .iter()
            .map(|input| ready(input.target()))
            .collect::<Result<Vec<_>, _>>()?;
        let textures = self
            .textures
            .iter()
            .map(|texture| ready(texture.texture()))
            .collect::<Result<Vec<_>, _>>()?;

        FullscreenDraw::new(program, output)
            .reading(&inputs)
            .sampling(&textures)
            .clearing(self.clear)
            .blended(self.blend)
            .submit(ctx.backend()?, &triangle)?;
        Ok(())
    }
}

impl RenderPass for FullscreenPass {
    fn draw(&mut self, ctx: &mut FrameContext<'_>, _children: &mut PassChildren) -> PassResult {
        self.run(ctx)
    }
}

/// Extracts lens-flare features from the downsampled HDR image, then adds
/// them, with dirt and star-burst, onto the scene color.
#[derive(Debug)]
pub struct LensFlarePass {
    features: FullscreenPass,
    apply: FullscreenPass,
    enabled: bool,
}

impl LensFlarePass {
    pub fn new(features: FullscreenPass, apply: FullscreenPass, enabled: bool) -> Self {
        Self {
            features,
            apply,
            enabled,
        }
    }
}

impl RenderPass for LensFlarePass {
    fn draw(&mut self, ctx: &mut FrameContext<'_>, _children: &mut PassChildren) -> PassResult {
        if !self.enabled {
            return Err(SkipReason::Disabled.into());
        }
        self.features.run(ctx)?;
        self.apply.run(ctx)
    }
}

/// Presents the final LDR image. Owns a triangle of its own so it can run
/// whether or not the shared one exists.
#[derive(Debug)]
pub struct CopyToBackBufferPass {
    shader: Arc<ShaderResource>,
    source: Arc<RenderTargetResource>,
    triangle: Option<FullscreenTriangle>,
}

impl CopyToBackBufferPass {
    pub fn new(shader: &Arc<ShaderResource>, source: &Arc<RenderTargetResource>) -> Self {
        Self {
            shader: Arc::clone(shader),
            source: Arc::clone(source),
            triangle: None,
        }
    }
}

impl RenderPass for CopyToBackBufferPass {
    fn draw(&mut self, ctx: &mut FrameContext<'_>, _children: &mut PassChildren) -> PassResult {
        let triangle = ready(self.triangle)?;
        let program = ready(self.shader.program())?;
        let source = ready(self.source.target())?;

        FullscreenDraw::new(program, Output::BackBuffer)
            .reading(&[source])
            .submit(ctx.backend()?, &triangle)?;
        Ok(())
    }

    fn allocate_resources(&mut self, resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        if self.triangle.is_none() {
            self.triangle = Some(FullscreenTriangle::create(
                resource_manager,
                "Copy to back buffer triangle",
            )?);
        }
        Ok(())
    }

    fn release_resources(&mut self, resource_manager: &dyn ResourceManager) {
        if let Some(triangle) = self.triangle.take() {
            triangle.release(resource_manager);
        }
    }
}
