//! The museum's render scheme.
//!
//! [`build_render_scheme`] wires the pass tree explicitly from the declared
//! [`SceneResources`]:
//!
//! ```text
//! Frame
//! ├── Shadow Map for Directional Light
//! ├── G-Buffer
//! │   ├── Terrain
//! │   ├── Scene Geometry
//! │   └── Depth Downsample
//! ├── Lighting
//! │   ├── Resolve Depth Buffer
//! │   ├── Directional Light
//! │   ├── SSAO
//! │   ├── HDR Downsample for Bloom
//! │   ├── Depth Downsample 2
//! │   ├── Screen Space Reflection
//! │   └── Directional Light Volume
//! ├── Post-Processing
//! │   ├── HDR Downsample
//! │   ├── Depth of Field
//! │   ├── Motion Blur
//! │   ├── Bloom
//! │   ├── Lens Flare
//! │   ├── HDR Tone Mapping
//! │   └── FXAA
//! ├── Copy to back buffer
//! └── UI
//! ```

mod common;
mod fullscreen;
mod geometry;
mod lighting;
mod post;

pub use common::{Blend, FramePass, FullscreenTriangle, SharedTriangle, TogglePass};
pub use fullscreen::{CopyToBackBufferPass, FullscreenPass, LensFlarePass, PassOutput};
pub use geometry::GeometryPass;
pub use lighting::{SSAO_BLUR_PASSES, SSAO_KERNEL_SIZE, SsaoPass, SsrPass, ssao_kernel};
pub use post::{BLOOM_KERNELS, BloomPass, DofPass, ToneMappingPass, ToneMappingShaders};

use gitech_graphics::PassNode;
use gitech_graphics::backend::ClearFlags;

use crate::scene::SceneResources;

/// Switches for optional effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub post_processing: bool,
    pub ssao: bool,
    pub bloom: bool,
    pub lens_flare: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            post_processing: true,
            ssao: true,
            bloom: true,
            lens_flare: true,
        }
    }
}

impl RenderOptions {
    /// Option names accepted by [`get`](Self::get) and [`set`](Self::set).
    pub const NAMES: [&'static str; 4] = ["post_processing", "ssao", "bloom", "lens_flare"];

    fn table(&mut self) -> [(&'static str, &mut bool); 4] {
        debug_assert!(
            Self::NAMES
                .iter()
                .enumerate()
                .all(|(i, name)| !Self::NAMES[..i].contains(name)),
            "duplicate render option name"
        );
        let [post_processing, ssao, bloom, lens_flare] = Self::NAMES;
        [
            (post_processing, &mut self.post_processing),
            (ssao, &mut self.ssao),
            (bloom, &mut self.bloom),
            (lens_flare, &mut self.lens_flare),
        ]
    }

    /// Value of the option called `name`, if there is one.
    pub fn get(&self, name: &str) -> Option<bool> {
        let mut copy = *self;
        copy.table()
            .into_iter()
            .find(|(option, _)| *option == name)
            .map(|(_, value)| *value)
    }

    /// Set the option called `name`. Returns false for an unknown name.
    pub fn set(&mut self, name: &str, enabled: bool) -> bool {
        match self.table().into_iter().find(|(option, _)| *option == name) {
            Some((_, value)) => {
                *value = enabled;
                true
            }
            None => false,
        }
    }
}

/// Build the full pass tree. Nothing is allocated until the tree's
/// `allocate_resources` runs.
pub fn build_render_scheme(scene: &SceneResources, options: &RenderOptions) -> PassNode {
    let triangle = SharedTriangle::new();

    PassNode::new("Frame", FramePass::new(triangle.clone()))
        .with_child(shadow_map(scene))
        .with_child(gbuffer(scene, &triangle))
        .with_child(lighting(scene, &triangle, options))
        .with_child(post_processing(scene, &triangle, options))
        .with_child(PassNode::new(
            "Copy to back buffer",
            CopyToBackBufferPass::new(&scene.shaders.color_copy, &scene.targets.ldr_fxaa),
        ))
        .with_child(PassNode::new(
            "UI",
            FullscreenPass::new(&triangle, &scene.shaders.ui, PassOutput::BackBuffer)
                .blended(Blend::Alpha),
        ))
}

fn shadow_map(scene: &SceneResources) -> PassNode {
    PassNode::new(
        "Shadow Map for Directional Light",
        GeometryPass::new(&scene.shaders.depth_pass, &scene.targets.shadow_map)
            .model(&scene.models.sponza)
            .clearing(ClearFlags::DEPTH),
    )
}

fn gbuffer(scene: &SceneResources, triangle: &SharedTriangle) -> PassNode {
    let shaders = &scene.shaders;
    let targets = &scene.targets;

    PassNode::group("G-Buffer")
        .with_child(PassNode::new(
            "Terrain",
            GeometryPass::new(&shaders.gbuffer_generation, &targets.gbuffer)
                .model(&scene.models.terrain)
                .clearing(ClearFlags::all()),
        ))
        .with_child(PassNode::new(
            "Scene Geometry",
            GeometryPass::new(&shaders.gbuffer_generation, &targets.gbuffer)
                .model(&scene.models.sponza)
                .materials(&scene.models.materials),
        ))
        .with_child(PassNode::new(
            "Depth Downsample",
            FullscreenPass::into_target(
                triangle,
                &shaders.downsample,
                &targets.hyperbolic_quarter_depth,
            )
            .reading(&targets.gbuffer),
        ))
}

fn lighting(scene: &SceneResources, triangle: &SharedTriangle, options: &RenderOptions) -> PassNode {
    let shaders = &scene.shaders;
    let targets = &scene.targets;
    let light = &targets.light_accumulation;

    PassNode::group("Lighting")
        .with_child(PassNode::new(
            "Resolve Depth Buffer",
            FullscreenPass::into_target(triangle, &shaders.depth_copy, light)
                .reading(&targets.gbuffer)
                .clearing(ClearFlags::all()),
        ))
        .with_child(PassNode::new(
            "Directional Light",
            FullscreenPass::into_target(triangle, &shaders.directional_light, light)
                .reading(&targets.gbuffer)
                .reading(&targets.shadow_map)
                .blended(Blend::Additive),
        ))
        .with_child(PassNode::new(
            "SSAO",
            SsaoPass::new(
                triangle,
                [&shaders.ssao, &shaders.bilateral_blur, &shaders.color_copy],
                &targets.gbuffer,
                &scene.textures.noise,
                &targets.ssao,
                light,
                options.ssao,
            ),
        ))
        .with_child(PassNode::new(
            "HDR Downsample for Bloom",
            FullscreenPass::into_target(
                triangle,
                &shaders.downsample,
                &targets.hdr_downsample_for_bloom,
            )
            .reading(light),
        ))
        .with_child(PassNode::new(
            "Depth Downsample 2",
            FullscreenPass::into_target(triangle, &shaders.downsample, &targets.linear_quarter_depth)
                .reading(&targets.hyperbolic_quarter_depth),
        ))
        .with_child(PassNode::new(
            "Screen Space Reflection",
            SsrPass::new(
                triangle,
                &shaders.screen_space_reflection,
                &shaders.color_copy,
                light,
                &targets.gbuffer,
                &targets.linear_quarter_depth,
            ),
        ))
        .with_child(PassNode::new(
            "Directional Light Volume",
            FullscreenPass::into_target(triangle, &shaders.directional_light_volume, light)
                .reading(&targets.linear_quarter_depth)
                .reading(&targets.shadow_map)
                .blended(Blend::Additive),
        ))
}

fn post_processing(
    scene: &SceneResources,
    triangle: &SharedTriangle,
    options: &RenderOptions,
) -> PassNode {
    let shaders = &scene.shaders;
    let targets = &scene.targets;
    let textures = &scene.textures;

    let lens_flare = LensFlarePass::new(
        FullscreenPass::into_target(triangle, &shaders.lens_flare_features, &targets.lens_flare)
            .reading(&targets.hdr_downsample_quarter)
            .sampling(&textures.lens_flare_ghost_color_lut)
            .clearing(ClearFlags::COLOR),
        FullscreenPass::into_target(triangle, &shaders.lens_flare_apply, &targets.motion_blur)
            .reading(&targets.lens_flare)
            .sampling(&textures.lens_flare_dirt)
            .sampling(&textures.lens_flare_star_burst)
            .blended(Blend::Additive),
        options.lens_flare,
    );

    let tone_mapping = ToneMappingPass::new(
        triangle,
        ToneMappingShaders {
            luma_capture: shaders.luma_capture.clone(),
            downsample: shaders.downsample.clone(),
            luma_adapt: shaders.luma_adapt.clone(),
            tone_mapping: shaders.hdr_tone_mapping.clone(),
        },
        &targets.motion_blur,
        &targets.average_luminance,
        &targets.adapted_luminance,
        &textures.bayer_matrix,
        &targets.ldr_tone_mapped,
    );

    PassNode::new("Post-Processing", TogglePass::new(options.post_processing))
        .with_child(PassNode::new(
            "HDR Downsample",
            FullscreenPass::into_target(
                triangle,
                &shaders.downsample,
                &targets.hdr_downsample_quarter,
            )
            .reading(&targets.light_accumulation),
        ))
        .with_child(PassNode::new(
            "Depth of Field",
            DofPass::new(
                triangle,
                &shaders.bokeh_dof,
                &targets.light_accumulation,
                &targets.linear_quarter_depth,
                &targets.autofocus,
                &targets.depth_of_field,
            ),
        ))
        .with_child(PassNode::new(
            "Motion Blur",
            FullscreenPass::into_target(triangle, &shaders.motion_blur, &targets.motion_blur)
                .reading(&targets.depth_of_field)
                .reading(&targets.gbuffer),
        ))
        .with_child(PassNode::new(
            "Bloom",
            BloomPass::new(
                triangle,
                &shaders.bloom,
                &shaders.color_copy,
                &targets.hdr_downsample_for_bloom,
                &targets.bloom,
                &targets.motion_blur,
                options.bloom,
            ),
        ))
        .with_child(PassNode::new("Lens Flare", lens_flare))
        .with_child(PassNode::new("HDR Tone Mapping", tone_mapping))
        .with_child(PassNode::new(
            "FXAA",
            FullscreenPass::into_target(triangle, &shaders.fxaa, &targets.ldr_fxaa)
                .reading(&targets.ldr_tone_mapped),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::declare_scene_resources;
    use gitech_graphics::resource::ResourceRegistry;

    fn scheme() -> PassNode {
        let mut builder = ResourceRegistry::builder();
        let scene = declare_scene_resources(&mut builder);
        build_render_scheme(&scene, &RenderOptions::default())
    }

    fn child_names(node: &PassNode) -> Vec<&str> {
        node.children().iter().map(PassNode::name).collect()
    }

    #[test]
    fn test_render_options_by_name() {
        let mut options = RenderOptions::default();
        for name in RenderOptions::NAMES {
            assert_eq!(options.get(name), Some(true), "{name}");
        }

        assert!(options.set("bloom", false));
        assert!(!options.set("motion_blur", false));
        assert_eq!(options.get("bloom"), Some(false));
        assert_eq!(options.get("motion_blur"), None);
        assert_eq!(
            options,
            RenderOptions {
                bloom: false,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_top_level_order() {
        let root = scheme();
        assert_eq!(root.name(), "Frame");
        assert_eq!(
            child_names(&root),
            [
                "Shadow Map for Directional Light",
                "G-Buffer",
                "Lighting",
                "Post-Processing",
                "Copy to back buffer",
                "UI",
            ]
        );
        assert_eq!(root.node_count(), 24);
    }

    #[test]
    fn test_lighting_and_post_processing_order() {
        let root = scheme();
        assert_eq!(
            child_names(root.find("Lighting").unwrap()),
            [
                "Resolve Depth Buffer",
                "Directional Light",
                "SSAO",
                "HDR Downsample for Bloom",
                "Depth Downsample 2",
                "Screen Space Reflection",
                "Directional Light Volume",
            ]
        );
        assert_eq!(
            child_names(root.find("Post-Processing").unwrap()),
            [
                "HDR Downsample",
                "Depth of Field",
                "Motion Blur",
                "Bloom",
                "Lens Flare",
                "HDR Tone Mapping",
                "FXAA",
            ]
        );
    }
}
