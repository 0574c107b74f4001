//! Post-processing passes built on ping-pong targets.

use std::sync::Arc;

use gitech_graphics::backend::{ClearFlags, RenderTargetHandle};
use gitech_graphics::pass::PassChildren;
use gitech_graphics::resource::{RenderTargetResource, ShaderResource, TextureResource};
use gitech_graphics::{FrameContext, PassResult, PingPong, RenderPass, SkipReason, StateScope};

use super::common::{Blend, FullscreenDraw, Output, SharedTriangle, ready, with_marker};
use crate::scene::LUMINANCE_CHAIN;

type Target = Arc<RenderTargetResource>;

// ============================================================================
// Bloom
// ============================================================================

/// Kawase kernel offsets, one blur iteration each.
pub const BLOOM_KERNELS: [u32; 5] = [0, 1, 2, 2, 3];

/// Bright-pass, iterative blur and additive composite.
///
/// The bright-pass writes the ping-pong seed. Iteration `i` reads what
/// iteration `i - 1` wrote, and the result is added onto the scene color.
#[derive(Debug)]
pub struct BloomPass {
    triangle: SharedTriangle,
    shader: Arc<ShaderResource>,
    composite: Arc<ShaderResource>,
    source: Target,
    targets: PingPong<Target>,
    destination: Target,
    enabled: bool,
}

impl BloomPass {
    pub fn new(
        triangle: &SharedTriangle,
        shader: &Arc<ShaderResource>,
        composite: &Arc<ShaderResource>,
        source: &Target,
        targets: &PingPong<Target>,
        destination: &Target,
        enabled: bool,
    ) -> Self {
        Self {
            triangle: triangle.clone(),
            shader: Arc::clone(shader),
            composite: Arc::clone(composite),
            source: Arc::clone(source),
            targets: targets.clone(),
            destination: Arc::clone(destination),
            enabled,
        }
    }
}

impl RenderPass for BloomPass {
    fn draw(&mut self, ctx: &mut FrameContext<'_>, _children: &mut PassChildren) -> PassResult {
        if !self.enabled {
            return Err(SkipReason::Disabled.into());
        }
        let triangle = self.triangle.get()?;
        let program = ready(self.shader.program())?;
        let composite = ready(self.composite.program())?;
        let source = ready(self.source.target())?;
        let seed = ready(self.targets.seed().target())?;
        let result = ready(self.targets.result_after(BLOOM_KERNELS.len()).target())?;
        let destination = ready(self.destination.target())?;

        let backend = ctx.backend()?;
        with_marker(backend, "Brightness Pass", |backend| {
            FullscreenDraw::new(program, Output::Target(seed))
                .reading(&[source])
                .clearing(ClearFlags::COLOR)
                .submit(backend, &triangle)
        })?;

        for (i, kernel) in BLOOM_KERNELS.iter().enumerate() {
            let (read, write) = self.targets.iteration(i);
            let (read, write) = (ready(read.target())?, ready(write.target())?);
            log::trace!("Bloom: iteration {i} kernel {kernel}");
            with_marker(backend, &format!("Kernel {kernel}"), |backend| {
                FullscreenDraw::new(program, Output::Target(write))
                    .reading(&[read])
                    .submit(backend, &triangle)
            })?;
        }

        with_marker(backend, "Apply", |backend| {
            FullscreenDraw::new(composite, Output::Target(destination))
                .reading(&[result])
                .blended(Blend::Additive)
                .submit(backend, &triangle)
        })?;
        Ok(())
    }
}

// ============================================================================
// Depth of field
// ============================================================================

/// Bokeh depth of field with temporal autofocus.
///
/// The autofocus target pair is flipped once per frame: this frame's focal
/// distance is blended from last frame's, so focus changes smoothly.
#[derive(Debug)]
pub struct DofPass {
    triangle: SharedTriangle,
    shader: Arc<ShaderResource>,
    color: Target,
    depth: Target,
    autofocus: PingPong<Target>,
    output: Target,
}

impl DofPass {
    pub fn new(
        triangle: &SharedTriangle,
        shader: &Arc<ShaderResource>,
        color: &Target,
        depth: &Target,
        autofocus: &PingPong<Target>,
        output: &Target,
    ) -> Self {
        Self {
            triangle: triangle.clone(),
            shader: Arc::clone(shader),
            color: Arc::clone(color),
            depth: Arc::clone(depth),
            autofocus: autofocus.clone(),
            output: Arc::clone(output),
        }
    }
}

impl RenderPass for DofPass {
    fn update(&mut self, _delta_time: f32) {
        self.autofocus.flip();
    }

    fn draw(&mut self, ctx: &mut FrameContext<'_>, _children: &mut PassChildren) -> PassResult {
        let triangle = self.triangle.get()?;
        let program = ready(self.shader.program())?;
        let color = ready(self.color.target())?;
        let depth = ready(self.depth.target())?;
        let (previous_focus, focus) = self.autofocus.pair();
        let (previous_focus, focus) = (ready(previous_focus.target())?, ready(focus.target())?);
        let output = ready(self.output.target())?;

        let backend = ctx.backend()?;
        with_marker(backend, "Autofocus", |backend| {
            FullscreenDraw::new(program, Output::Target(focus))
                .reading(&[depth, previous_focus])
                .submit(backend, &triangle)
        })?;
        with_marker(backend, "Bokeh", |backend| {
            FullscreenDraw::new(program, Output::Target(output))
                .reading(&[color, depth, focus])
                .clearing(ClearFlags::COLOR)
                .submit(backend, &triangle)
        })?;
        Ok(())
    }
}

// ============================================================================
// Tone mapping
// ============================================================================

/// Shader programs used by [`ToneMappingPass`].
#[derive(Debug, Clone)]
pub struct ToneMappingShaders {
    pub luma_capture: Arc<ShaderResource>,
    pub downsample: Arc<ShaderResource>,
    pub luma_adapt: Arc<ShaderResource>,
    pub tone_mapping: Arc<ShaderResource>,
}

/// Eye adaptation and HDR to LDR conversion.
///
/// 1. Average luminance: capture into the 64x64 target, then downsample
///    through 16x16 and 4x4 to 1x1.
/// 2. Adaptation: blend last frame's adapted luminance towards the new
///    average. The adapted pair is flipped once per frame in `update`.
/// 3. Tone map into the sRGB LDR target with sRGB writes on.
#[derive(Debug)]
pub struct ToneMappingPass {
    triangle: SharedTriangle,
    shaders: ToneMappingShaders,
    source: Target,
    luminance: [Target; 4],
    adapted: PingPong<Target>,
    dither: Arc<TextureResource>,
    output: Target,
    delta_time: f32,
}

impl ToneMappingPass {
    pub fn new(
        triangle: &SharedTriangle,
        shaders: ToneMappingShaders,
        source: &Target,
        luminance: &[Target; 4],
        adapted: &PingPong<Target>,
        dither: &Arc<TextureResource>,
        output: &Target,
    ) -> Self {
        Self {
            triangle: triangle.clone(),
            shaders,
            source: Arc::clone(source),
            luminance: luminance.clone(),
            adapted: adapted.clone(),
            dither: Arc::clone(dither),
            output: Arc::clone(output),
            delta_time: 0.0,
        }
    }
}

impl RenderPass for ToneMappingPass {
    fn update(&mut self, delta_time: f32) {
        self.delta_time = delta_time;
        self.adapted.flip();
    }

    fn draw(&mut self, ctx: &mut FrameContext<'_>, _children: &mut PassChildren) -> PassResult {
        let triangle = self.triangle.get()?;
        let capture = ready(self.shaders.luma_capture.program())?;
        let downsample = ready(self.shaders.downsample.program())?;
        let adapt = ready(self.shaders.luma_adapt.program())?;
        let tone_map = ready(self.shaders.tone_mapping.program())?;
        let source = ready(self.source.target())?;
        let chain = self
            .luminance
            .iter()
            .map(|target| ready(target.target()))
            .collect::<Result<Vec<RenderTargetHandle>, _>>()?;
        let (previous, adapted) = self.adapted.pair();
        let (previous, adapted) = (ready(previous.target())?, ready(adapted.target())?);
        let dither = ready(self.dither.texture())?;
        let output = ready(self.output.target())?;

        let backend = ctx.backend()?;
        with_marker(backend, "Luminance Calculation", |backend| {
            let mut input = source;
            for (i, (&target, side)) in chain.iter().zip(LUMINANCE_CHAIN).enumerate() {
                let program = if i == 0 { capture } else { downsample };
                with_marker(backend, &format!("{side}x{side}"), |backend| {
                    FullscreenDraw::new(program, Output::Target(target))
                        .reading(&[input])
                        .submit(backend, &triangle)
                })?;
                input = target;
            }
            Ok::<_, gitech_graphics::ResourceError>(())
        })?;

        log::trace!("Tone mapping: adapting over {:.4}s", self.delta_time);
        with_marker(backend, "Luminance Adaptation", |backend| {
            FullscreenDraw::new(adapt, Output::Target(adapted))
                .reading(&[chain[chain.len() - 1], previous])
                .submit(backend, &triangle)
        })?;

        let mut scope = StateScope::new(backend);
        scope.modify(|state| state.srgb_write = true);
        FullscreenDraw::new(tone_map, Output::Target(output))
            .reading(&[source, adapted])
            .sampling(&[dither])
            .submit(&mut *scope, &triangle)?;
        Ok(())
    }
}
