//! Scene resource declarations.
//!
//! Everything the museum scene needs on the GPU is declared here, once, into
//! a [`ResourceRegistryBuilder`]. The returned [`SceneResources`] holds a
//! typed `Arc` to every record so the render scheme can pick up handles after
//! the loader has initialized them.

use std::sync::Arc;

use gitech_graphics::PingPong;
use gitech_graphics::backend::{Extent2d, PixelFormat, RenderTargetDescriptor, TargetSize};
use gitech_graphics::resource::{
    MaterialResource, MaterialSlot, MeshLayout, ModelResource, RenderTargetResource,
    ResourceRegistryBuilder, ShaderResource, TextureResource,
};

/// Side of the directional light's shadow map.
pub const SHADOW_MAP_SIZE: u32 = 2048;

/// Sides of the average luminance chain, largest first.
pub const LUMINANCE_CHAIN: [u32; 4] = [64, 16, 4, 1];

type Target = Arc<RenderTargetResource>;

// ============================================================================
// Resource groups
// ============================================================================

/// Shader programs.
#[derive(Debug, Clone)]
pub struct SceneShaders {
    pub depth_pass: Arc<ShaderResource>,
    pub gbuffer_generation: Arc<ShaderResource>,
    pub depth_copy: Arc<ShaderResource>,
    pub directional_light: Arc<ShaderResource>,
    pub directional_light_volume: Arc<ShaderResource>,
    pub ssao: Arc<ShaderResource>,
    pub bilateral_blur: Arc<ShaderResource>,
    pub downsample: Arc<ShaderResource>,
    pub screen_space_reflection: Arc<ShaderResource>,
    pub bokeh_dof: Arc<ShaderResource>,
    pub motion_blur: Arc<ShaderResource>,
    pub bloom: Arc<ShaderResource>,
    pub lens_flare_features: Arc<ShaderResource>,
    pub lens_flare_apply: Arc<ShaderResource>,
    pub luma_capture: Arc<ShaderResource>,
    pub luma_adapt: Arc<ShaderResource>,
    pub hdr_tone_mapping: Arc<ShaderResource>,
    pub fxaa: Arc<ShaderResource>,
    pub color_copy: Arc<ShaderResource>,
    pub ui: Arc<ShaderResource>,
}

/// Standalone textures.
#[derive(Debug, Clone)]
pub struct SceneTextures {
    pub noise: Arc<TextureResource>,
    pub lens_flare_dirt: Arc<TextureResource>,
    pub lens_flare_star_burst: Arc<TextureResource>,
    pub lens_flare_ghost_color_lut: Arc<TextureResource>,
    pub bayer_matrix: Arc<TextureResource>,
}

/// Models and the materials their meshes cycle through.
#[derive(Debug, Clone)]
pub struct SceneModels {
    pub sponza: Arc<ModelResource>,
    pub terrain: Arc<ModelResource>,
    pub materials: Vec<Arc<MaterialResource>>,
}

/// Render targets.
#[derive(Debug, Clone)]
pub struct SceneTargets {
    /// Albedo, normals, material and velocity, plus depth-stencil.
    pub gbuffer: Target,
    pub shadow_map: Target,
    pub light_accumulation: Target,
    pub linear_quarter_depth: Target,
    pub hyperbolic_quarter_depth: Target,
    pub ssao: PingPong<Target>,
    pub hdr_downsample_quarter: Target,
    pub hdr_downsample_for_bloom: Target,
    pub bloom: PingPong<Target>,
    pub average_luminance: [Target; 4],
    pub adapted_luminance: PingPong<Target>,
    pub depth_of_field: Target,
    pub autofocus: PingPong<Target>,
    pub motion_blur: Target,
    pub lens_flare: Target,
    pub ldr_tone_mapped: Target,
    pub ldr_fxaa: Target,
}

/// Every declared scene resource.
#[derive(Debug, Clone)]
pub struct SceneResources {
    pub shaders: SceneShaders,
    pub textures: SceneTextures,
    pub models: SceneModels,
    pub targets: SceneTargets,
}

// ============================================================================
// Declarations
// ============================================================================

/// Declare the scene into `builder`.
///
/// Records are registered in dependency-free order: nothing here references
/// another record, so any loader thread may initialize any entry.
pub fn declare_scene_resources(builder: &mut ResourceRegistryBuilder) -> SceneResources {
    let models = declare_models(builder);
    let shaders = declare_shaders(builder);
    let textures = declare_textures(builder);
    let targets = declare_targets(builder);
    log::debug!("Declared {} scene resources", builder.len());

    SceneResources {
        shaders,
        textures,
        models,
        targets,
    }
}

fn shader(builder: &mut ResourceRegistryBuilder, name: &str) -> Arc<ShaderResource> {
    let path = format!("shaders/{name}.hlsl");
    builder.register(path.clone(), ShaderResource::new(path.clone(), path))
}

fn declare_shaders(builder: &mut ResourceRegistryBuilder) -> SceneShaders {
    SceneShaders {
        depth_pass: shader(builder, "DepthPass"),
        gbuffer_generation: shader(builder, "GBufferGeneration"),
        depth_copy: shader(builder, "DepthCopy"),
        directional_light: shader(builder, "DirectionalLight"),
        directional_light_volume: shader(builder, "DirectionalLightVolume"),
        ssao: shader(builder, "SSAO"),
        bilateral_blur: shader(builder, "BilateralBlur"),
        downsample: shader(builder, "Downsample"),
        screen_space_reflection: shader(builder, "ScreenSpaceReflection"),
        bokeh_dof: shader(builder, "BokehDoF"),
        motion_blur: shader(builder, "MotionBlur"),
        bloom: shader(builder, "Bloom"),
        lens_flare_features: shader(builder, "SphericalLensFlareFeatures"),
        lens_flare_apply: shader(builder, "LensFlareApply"),
        luma_capture: shader(builder, "LumaCapture"),
        luma_adapt: shader(builder, "LumaAdapt"),
        hdr_tone_mapping: shader(builder, "HDRToneMapping"),
        fxaa: shader(builder, "FXAA"),
        color_copy: shader(builder, "ColorCopy"),
        ui: shader(builder, "UI"),
    }
}

fn texture(
    builder: &mut ResourceRegistryBuilder,
    name: &str,
    size: Extent2d,
    format: PixelFormat,
) -> Arc<TextureResource> {
    let path = format!("textures/{name}.s3dtex");
    builder.register(path.clone(), TextureResource::new(path, size, format))
}

fn declare_textures(builder: &mut ResourceRegistryBuilder) -> SceneTextures {
    SceneTextures {
        noise: texture(builder, "noise", Extent2d::new(4, 4), PixelFormat::Rgba8Unorm),
        lens_flare_dirt: texture(
            builder,
            "LensFlareDirt",
            Extent2d::new(1920, 1080),
            PixelFormat::Rgba8Unorm,
        ),
        lens_flare_star_burst: texture(
            builder,
            "LensFlareStarBurst",
            Extent2d::new(512, 512),
            PixelFormat::Rgba8Unorm,
        ),
        lens_flare_ghost_color_lut: texture(
            builder,
            "LensFlareGhostColorLUT",
            Extent2d::new(256, 1),
            PixelFormat::Rgba8Unorm,
        ),
        bayer_matrix: texture(builder, "bayer_matrix", Extent2d::new(8, 8), PixelFormat::R16Float),
    }
}

/// Sponza material groups, cycled over the model's meshes.
const SPONZA_MATERIALS: [&str; 8] = [
    "sponza_arch",
    "sponza_bricks",
    "sponza_ceiling",
    "sponza_column_a",
    "sponza_floor",
    "sponza_curtain",
    "lion",
    "vase",
];

fn declare_models(builder: &mut ResourceRegistryBuilder) -> SceneModels {
    let sponza_meshes: Vec<MeshLayout> = (0..SPONZA_MATERIALS.len() as u32)
        .map(|i| MeshLayout {
            vertex_count: 4_096 + i * 1_024,
            index_count: 12_288 + i * 3_072,
        })
        .collect();
    let sponza = builder.register(
        "models/sponza/sponza.s3dmdl",
        ModelResource::new("models/sponza/sponza.s3dmdl", sponza_meshes),
    );
    let terrain = builder.register(
        "models/terrain/terrain.s3dmdl",
        ModelResource::new(
            "models/terrain/terrain.s3dmdl",
            [MeshLayout {
                vertex_count: 66_049,
                index_count: 393_216,
            }],
        ),
    );

    let material_size = Extent2d::new(1024, 1024);
    let materials = SPONZA_MATERIALS
        .iter()
        .map(|name| {
            let base = format!("textures/sponza/{name}");
            builder.register(
                format!("material {name}"),
                MaterialResource::new(*name)
                    .with_texture(
                        MaterialSlot::Diffuse,
                        format!("{base}_diff.s3dtex"),
                        material_size,
                        PixelFormat::Rgba8UnormSrgb,
                    )
                    .with_texture(
                        MaterialSlot::Normal,
                        format!("{base}_ddn.s3dtex"),
                        material_size,
                        PixelFormat::Rgba8Unorm,
                    )
                    .with_texture(
                        MaterialSlot::Specular,
                        format!("{base}_spec.s3dtex"),
                        material_size,
                        PixelFormat::Rgba8Unorm,
                    )
                    .with_texture(
                        MaterialSlot::Roughness,
                        format!("{base}_rough.s3dtex"),
                        material_size,
                        PixelFormat::Rgba8Unorm,
                    ),
            )
        })
        .collect();

    SceneModels {
        sponza,
        terrain,
        materials,
    }
}

fn target(builder: &mut ResourceRegistryBuilder, descriptor: RenderTargetDescriptor) -> Target {
    builder.register(descriptor.label.clone(), RenderTargetResource::new(descriptor))
}

fn color(
    builder: &mut ResourceRegistryBuilder,
    label: &str,
    size: TargetSize,
    format: PixelFormat,
) -> Target {
    target(builder, RenderTargetDescriptor::color(label, size, format))
}

fn color_pair(
    builder: &mut ResourceRegistryBuilder,
    label: &str,
    size: TargetSize,
    format: PixelFormat,
) -> PingPong<Target> {
    PingPong::new([
        color(builder, &format!("{label}0"), size, format),
        color(builder, &format!("{label}1"), size, format),
    ])
}

fn declare_targets(builder: &mut ResourceRegistryBuilder) -> SceneTargets {
    let full = TargetSize::full_resolution();
    let half = TargetSize::relative(0.5, 0.5);
    let quarter = TargetSize::relative(0.25, 0.25);
    let hdr = PixelFormat::Rgba16Float;

    let gbuffer = target(
        builder,
        RenderTargetDescriptor::color("GBuffer", full, PixelFormat::Rgba8Unorm)
            .with_color(PixelFormat::Rg16Float)
            .with_color(PixelFormat::Rg16Float)
            .with_color(PixelFormat::Rg16Float)
            .with_depth(PixelFormat::Depth24Stencil8),
    );
    let shadow_map = target(
        builder,
        RenderTargetDescriptor {
            label: "ShadowMapDir".into(),
            size: TargetSize::fixed(SHADOW_MAP_SIZE, SHADOW_MAP_SIZE),
            color_formats: Vec::new(),
            depth_format: Some(PixelFormat::Depth32Float),
        },
    );
    let light_accumulation = target(
        builder,
        RenderTargetDescriptor::color("LightAccumulationBuffer", full, hdr)
            .with_depth(PixelFormat::Depth24Stencil8),
    );

    let average_luminance = LUMINANCE_CHAIN.map(|side| {
        color(
            builder,
            &format!("AverageLuminanceBuffer {side}x{side}"),
            TargetSize::fixed(side, side),
            PixelFormat::R16Float,
        )
    });
    let one_texel = TargetSize::fixed(1, 1);

    SceneTargets {
        gbuffer,
        shadow_map,
        light_accumulation,
        linear_quarter_depth: color(
            builder,
            "LinearQuarterDepthBuffer",
            half,
            PixelFormat::R32Float,
        ),
        hyperbolic_quarter_depth: color(
            builder,
            "HyperbolicQuarterDepthBuffer",
            half,
            PixelFormat::R32Float,
        ),
        ssao: color_pair(builder, "SSAOFullBuffer", full, PixelFormat::R16Float),
        hdr_downsample_quarter: color(builder, "HDRDownsampleQuarterBuffer", half, hdr),
        hdr_downsample_for_bloom: color(builder, "HDRDownsampleForBloomBuffer", quarter, hdr),
        bloom: color_pair(builder, "BloomBuffer", quarter, hdr),
        average_luminance,
        adapted_luminance: color_pair(builder, "AdaptedLuminance", one_texel, PixelFormat::R16Float),
        depth_of_field: color(builder, "DepthOfFieldBuffer", full, hdr),
        autofocus: color_pair(builder, "AutofocusBuffer", one_texel, PixelFormat::R16Float),
        motion_blur: color(builder, "MotionBlurBuffer", full, hdr),
        lens_flare: color(builder, "SphericalLensFlareBuffer", half, hdr),
        ldr_tone_mapped: color(
            builder,
            "LDRToneMappedImageBuffer",
            full,
            PixelFormat::Rgba8UnormSrgb,
        ),
        ldr_fxaa: color(builder, "LDRFxaaImageBuffer", full, PixelFormat::Rgba8Unorm),
    }
}
