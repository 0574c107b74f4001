//! Lighting passes with state of their own.

use std::f32::consts::TAU;
use std::sync::Arc;

use gitech_graphics::backend::{ClearFlags, PixelFormat, TargetSize};
use gitech_graphics::pass::PassChildren;
use gitech_graphics::resource::{RenderTargetResource, ShaderResource, TextureResource};
use gitech_graphics::{
    DynamicRenderTarget, FrameContext, PassResult, PingPong, RenderPass, ResourceManager,
    ResourceResult, SkipReason,
};

use super::common::{Blend, FullscreenDraw, Output, SharedTriangle, ready, with_marker};

/// Samples in the SSAO hemisphere kernel.
pub const SSAO_KERNEL_SIZE: usize = 16;

/// Bilateral blur iterations applied to the raw occlusion.
pub const SSAO_BLUR_PASSES: usize = 2;

fn radical_inverse(mut n: u32, base: u32) -> f32 {
    let mut scale = 1.0 / base as f32;
    let mut result = 0.0;
    while n > 0 {
        result += (n % base) as f32 * scale;
        n /= base;
        scale /= base as f32;
    }
    result
}

/// Sample offsets in the +Z tangent-space hemisphere.
///
/// Directions come from a Halton sequence, so the kernel is the same on every
/// run. Lengths grow quadratically from 0.1 to 1.0, clustering samples near
/// the shaded point.
pub fn ssao_kernel(samples: usize) -> Vec<[f32; 3]> {
    (0..samples)
        .map(|i| {
            let n = i as u32 + 1;
            let phi = TAU * radical_inverse(n, 2);
            let cos_theta = radical_inverse(n, 3);
            let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
            let t = i as f32 / samples as f32;
            let length = 0.1 + 0.9 * t * t;
            [
                phi.cos() * sin_theta * length,
                phi.sin() * sin_theta * length,
                cos_theta * length,
            ]
        })
        .collect()
}

// ============================================================================
// SSAO
// ============================================================================

/// Screen-space ambient occlusion.
///
/// Raw occlusion goes into the ping-pong seed, is blurred back and forth, and
/// the result darkens the light accumulation buffer multiplicatively.
#[derive(Debug)]
pub struct SsaoPass {
    triangle: SharedTriangle,
    ssao: Arc<ShaderResource>,
    blur: Arc<ShaderResource>,
    apply: Arc<ShaderResource>,
    gbuffer: Arc<RenderTargetResource>,
    noise: Arc<TextureResource>,
    targets: PingPong<Arc<RenderTargetResource>>,
    light_accumulation: Arc<RenderTargetResource>,
    kernel: Vec<[f32; 3]>,
    enabled: bool,
}

impl SsaoPass {
    pub fn new(
        triangle: &SharedTriangle,
        shaders: [&Arc<ShaderResource>; 3],
        gbuffer: &Arc<RenderTargetResource>,
        noise: &Arc<TextureResource>,
        targets: &PingPong<Arc<RenderTargetResource>>,
        light_accumulation: &Arc<RenderTargetResource>,
        enabled: bool,
    ) -> Self {
        let [ssao, blur, apply] = shaders.map(Arc::clone);
        Self {
            triangle: triangle.clone(),
            ssao,
            blur,
            apply,
            gbuffer: Arc::clone(gbuffer),
            noise: Arc::clone(noise),
            targets: targets.clone(),
            light_accumulation: Arc::clone(light_accumulation),
            kernel: Vec::new(),
            enabled,
        }
    }
}

impl RenderPass for SsaoPass {
    fn draw(&mut self, ctx: &mut FrameContext<'_>, _children: &mut PassChildren) -> PassResult {
        if !self.enabled {
            return Err(SkipReason::Disabled.into());
        }
        if self.kernel.is_empty() {
            return Err(SkipReason::ResourcesNotReady.into());
        }
        let triangle = self.triangle.get()?;
        let [ssao, blur, apply] = [&self.ssao, &self.blur, &self.apply]
            .map(|shader| shader.program())
            .map(ready);
        let (ssao, blur, apply) = (ssao?, blur?, apply?);
        let gbuffer = ready(self.gbuffer.target())?;
        let noise = ready(self.noise.texture())?;
        let light = ready(self.light_accumulation.target())?;
        let seed = ready(self.targets.seed().target())?;
        let result = ready(self.targets.result_after(SSAO_BLUR_PASSES).target())?;

        let backend = ctx.backend()?;
        FullscreenDraw::new(ssao, Output::Target(seed))
            .reading(&[gbuffer])
            .sampling(&[noise])
            .clearing(ClearFlags::COLOR)
            .submit(backend, &triangle)?;

        with_marker(backend, "Bilateral Blur", |backend| -> PassResult {
            for i in 0..SSAO_BLUR_PASSES {
                let (read, write) = self.targets.iteration(i);
                let (read, write) = (ready(read.target())?, ready(write.target())?);
                FullscreenDraw::new(blur, Output::Target(write))
                    .reading(&[read, gbuffer])
                    .submit(backend, &triangle)?;
            }
            Ok(())
        })?;

        FullscreenDraw::new(apply, Output::Target(light))
            .reading(&[result])
            .blended(Blend::Multiply)
            .submit(backend, &triangle)?;
        Ok(())
    }

    fn allocate_resources(&mut self, _resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        self.kernel = ssao_kernel(SSAO_KERNEL_SIZE);
        log::debug!("SSAO: kernel of {} samples", self.kernel.len());
        Ok(())
    }

    fn release_resources(&mut self, _resource_manager: &dyn ResourceManager) {
        self.kernel.clear();
    }
}

// ============================================================================
// Screen-space reflection
// ============================================================================

/// Screen-space reflections traced against a copy of the light accumulation
/// buffer, so the buffer can be both traced and written in one draw.
///
/// The copy lives outside the declared table and follows the source's size,
/// checked every frame.
#[derive(Debug)]
pub struct SsrPass {
    triangle: SharedTriangle,
    trace: Arc<ShaderResource>,
    copy_shader: Arc<ShaderResource>,
    light_accumulation: Arc<RenderTargetResource>,
    gbuffer: Arc<RenderTargetResource>,
    depth: Arc<RenderTargetResource>,
    copy: DynamicRenderTarget,
}

impl SsrPass {
    pub fn new(
        triangle: &SharedTriangle,
        trace: &Arc<ShaderResource>,
        copy_shader: &Arc<ShaderResource>,
        light_accumulation: &Arc<RenderTargetResource>,
        gbuffer: &Arc<RenderTargetResource>,
        depth: &Arc<RenderTargetResource>,
    ) -> Self {
        Self {
            triangle: triangle.clone(),
            trace: Arc::clone(trace),
            copy_shader: Arc::clone(copy_shader),
            light_accumulation: Arc::clone(light_accumulation),
            gbuffer: Arc::clone(gbuffer),
            depth: Arc::clone(depth),
            copy: DynamicRenderTarget::new(
                "SSR light accumulation copy",
                TargetSize::full_resolution(),
                PixelFormat::Rgba16Float,
            ),
        }
    }
}

impl RenderPass for SsrPass {
    fn draw(&mut self, ctx: &mut FrameContext<'_>, _children: &mut PassChildren) -> PassResult {
        let resource_manager = ctx.resources()?;
        let triangle = self.triangle.get()?;
        let trace = ready(self.trace.program())?;
        let copy_program = ready(self.copy_shader.program())?;
        let light = ready(self.light_accumulation.target())?;
        let gbuffer = ready(self.gbuffer.target())?;
        let depth = ready(self.depth.target())?;

        let size = ready(resource_manager.render_target_size(light))?;
        self.copy.ensure_size(resource_manager.as_ref(), size)?;
        let copy = ready(self.copy.handle())?;

        let backend = ctx.backend()?;
        FullscreenDraw::new(copy_program, Output::Target(copy))
            .reading(&[light])
            .submit(backend, &triangle)?;
        FullscreenDraw::new(trace, Output::Target(light))
            .reading(&[copy, gbuffer, depth])
            .blended(Blend::Additive)
            .submit(backend, &triangle)?;
        Ok(())
    }

    fn release_resources(&mut self, resource_manager: &dyn ResourceManager) {
        self.copy.release(resource_manager);
    }
}
