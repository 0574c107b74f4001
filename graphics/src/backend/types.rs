//! Plain data shared between passes, resources and backends.

use bitflags::bitflags;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Wraps a raw index handed out by a resource manager.
            pub const fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// The raw index.
            pub const fn index(self) -> u32 {
                self.0
            }
        }
    };
}

define_handle!(
    /// Handle to a vertex format (attribute layout).
    VertexFormatHandle
);
define_handle!(
    /// Handle to a vertex buffer.
    VertexBufferHandle
);
define_handle!(
    /// Handle to an index buffer.
    IndexBufferHandle
);
define_handle!(
    /// Handle to a linked vertex + pixel shader program.
    ShaderProgramHandle
);
define_handle!(
    /// Handle to a sampled texture.
    TextureHandle
);
define_handle!(
    /// Handle to a render target (one or more color surfaces plus optional depth).
    RenderTargetHandle
);

/// Two-dimensional pixel extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2d {
    /// Create an extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered.
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether either side is zero.
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Extent2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Size policy of a render target.
///
/// `Relative` targets follow the back buffer: a `0.5 x 0.5` target is a
/// quarter-resolution surface that must be rebuilt whenever the back buffer
/// changes size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetSize {
    /// Fixed size in pixels.
    Fixed(Extent2d),
    /// Ratios applied to the back-buffer size.
    Relative {
        /// Width as a fraction of the back-buffer width.
        width_ratio: f32,
        /// Height as a fraction of the back-buffer height.
        height_ratio: f32,
    },
}

impl TargetSize {
    /// A fixed-size target.
    pub const fn fixed(width: u32, height: u32) -> Self {
        Self::Fixed(Extent2d::new(width, height))
    }

    /// A back-buffer-relative target.
    pub const fn relative(width_ratio: f32, height_ratio: f32) -> Self {
        Self::Relative {
            width_ratio,
            height_ratio,
        }
    }

    /// Same size as the back buffer.
    pub const fn full_resolution() -> Self {
        Self::relative(1.0, 1.0)
    }

    /// Whether the size depends on the back buffer.
    pub const fn is_relative(&self) -> bool {
        matches!(self, Self::Relative { .. })
    }

    /// Resolve to a pixel size for the given back buffer.
    ///
    /// Ratios truncate toward zero and clamp each side to at least one pixel.
    pub fn resolve(&self, back_buffer: Extent2d) -> Extent2d {
        match *self {
            Self::Fixed(extent) => extent,
            Self::Relative {
                width_ratio,
                height_ratio,
            } => Extent2d::new(
                ((back_buffer.width as f32 * width_ratio) as u32).max(1),
                ((back_buffer.height as f32 * height_ratio) as u32).max(1),
            ),
        }
    }
}

/// Pixel formats understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit RGBA, linear.
    Rgba8Unorm,
    /// 8-bit RGBA, sRGB encoded.
    Rgba8UnormSrgb,
    /// 16-bit float RGBA (HDR color).
    Rgba16Float,
    /// Two-channel 16-bit float (velocity, normals).
    Rg16Float,
    /// Single-channel 16-bit float.
    R16Float,
    /// Single-channel 32-bit float (luminance, linear depth).
    R32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24Stencil8,
    /// 32-bit float depth.
    Depth32Float,
}

impl PixelFormat {
    /// Whether this is a depth (or depth-stencil) format.
    pub const fn is_depth(self) -> bool {
        matches!(self, Self::Depth24Stencil8 | Self::Depth32Float)
    }

    /// Size of one pixel in bytes.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::R16Float => 2,
            Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Rg16Float
            | Self::R32Float
            | Self::Depth24Stencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
        }
    }
}

/// Blend factor for color blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    Zero,
    #[default]
    One,
    SrcAlpha,
    InvSrcAlpha,
    SrcColor,
    InvSrcColor,
}

/// Comparison function for depth testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    #[default]
    LessEqual,
    Greater,
    GreaterEqual,
    Always,
}

/// Fixed-function state that passes save, mutate and restore around draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub blend_enabled: bool,
    pub src_blend: BlendFactor,
    pub dst_blend: BlendFactor,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
    pub scissor_test: bool,
    pub srgb_write: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            blend_enabled: false,
            src_blend: BlendFactor::One,
            dst_blend: BlendFactor::Zero,
            depth_test: true,
            depth_write: true,
            depth_compare: CompareFunction::LessEqual,
            scissor_test: false,
            srgb_write: false,
        }
    }
}

impl RenderState {
    /// Additive blending with depth writes off, as used by accumulation passes.
    pub fn additive(mut self) -> Self {
        self.blend_enabled = true;
        self.src_blend = BlendFactor::One;
        self.dst_blend = BlendFactor::One;
        self.depth_write = false;
        self
    }

    /// Depth test and writes disabled, for full-screen passes.
    pub fn fullscreen(mut self) -> Self {
        self.depth_test = false;
        self.depth_write = false;
        self.depth_compare = CompareFunction::Always;
        self
    }
}

bitflags! {
    /// Which attachments to clear when binding a render target.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Vertex attribute semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position,
    Normal,
    Tangent,
    Binormal,
    TexCoord,
    Color,
}

impl VertexSemantic {
    /// Size of the attribute in bytes.
    pub const fn size(self) -> u32 {
        match self {
            Self::TexCoord => 8,
            Self::Color => 4,
            Self::Position | Self::Normal | Self::Tangent | Self::Binormal => 12,
        }
    }
}

/// Index element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    #[default]
    U16,
    U32,
}

/// Describes a vertex format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFormatDescriptor {
    /// Attributes in buffer order.
    pub attributes: Vec<VertexSemantic>,
}

impl VertexFormatDescriptor {
    /// Create a format from a list of attributes.
    pub fn new(attributes: impl Into<Vec<VertexSemantic>>) -> Self {
        Self {
            attributes: attributes.into(),
        }
    }

    /// Position + texcoord, used by full-screen geometry.
    pub fn position_texcoord() -> Self {
        Self::new([VertexSemantic::Position, VertexSemantic::TexCoord])
    }

    /// Stride of one vertex in bytes.
    pub fn stride(&self) -> u32 {
        self.attributes.iter().map(|a| a.size()).sum()
    }
}

/// Describes a vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferDescriptor {
    pub label: String,
    pub format: VertexFormatHandle,
    pub vertex_count: u32,
}

/// Describes an index buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBufferDescriptor {
    pub label: String,
    pub format: IndexFormat,
    pub index_count: u32,
}

/// Describes a shader program by its source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgramDescriptor {
    pub label: String,
    pub vertex_source: String,
    pub pixel_source: String,
}

/// Describes a sampled texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub label: String,
    pub size: Extent2d,
    pub format: PixelFormat,
    pub mip_levels: u32,
}

/// Describes a render target.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDescriptor {
    pub label: String,
    pub size: TargetSize,
    /// Color surfaces, one per simultaneous output.
    pub color_formats: Vec<PixelFormat>,
    pub depth_format: Option<PixelFormat>,
}

impl RenderTargetDescriptor {
    /// A single-color-surface target without depth.
    pub fn color(label: impl Into<String>, size: TargetSize, format: PixelFormat) -> Self {
        Self {
            label: label.into(),
            size,
            color_formats: vec![format],
            depth_format: None,
        }
    }

    /// Add a depth surface.
    pub fn with_depth(mut self, format: PixelFormat) -> Self {
        self.depth_format = Some(format);
        self
    }

    /// Add another color surface.
    pub fn with_color(mut self, format: PixelFormat) -> Self {
        self.color_formats.push(format);
        self
    }
}
