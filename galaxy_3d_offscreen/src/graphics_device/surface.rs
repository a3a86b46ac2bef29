/// Surface trait and creation options

use std::fmt;
use serde::{Deserialize, Serialize};

/// Identifier of a device surface, unique for the lifetime of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// GPU surface created by a `GraphicsDevice`
///
/// Exclusively owned by the render target that requested it. Other draw
/// calls may sample it once it is unbound.
pub trait Surface: Send + Sync {
    /// Device-unique id
    fn id(&self) -> SurfaceId;

    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    /// Whether this is a six-face cube surface
    fn is_cube(&self) -> bool;
}

/// Texel storage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureType {
    UnsignedInt,
    HalfFloat,
    Float,
}

/// Texel channel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFormat {
    Alpha,
    Luminance,
    LuminanceAlpha,
    R,
    Rg,
    Rgb,
    Rgba,
}

/// Texture filtering used when the target is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingMode {
    Nearest,
    Bilinear,
    Trilinear,
}

/// Depth comparison function for comparison samplers (shadow maps)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Creation bundle for a render target's color surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderTargetOptions {
    /// Generate mipmaps after rendering
    pub generate_mip_maps: bool,
    /// Texel storage type
    pub texture_type: TextureType,
    /// Texel channel layout
    pub format: TextureFormat,
    /// Sampling mode
    pub sampling_mode: SamplingMode,
    /// Allocate a depth renderbuffer with the color surface
    pub generate_depth_buffer: bool,
    /// Allocate a stencil renderbuffer with the color surface
    pub generate_stencil_buffer: bool,
    /// Multiple color outputs (draw buffers)
    pub is_multi: bool,
}

impl Default for RenderTargetOptions {
    fn default() -> Self {
        Self {
            generate_mip_maps: false,
            texture_type: TextureType::UnsignedInt,
            format: TextureFormat::Rgba,
            sampling_mode: SamplingMode::Trilinear,
            generate_depth_buffer: true,
            generate_stencil_buffer: false,
            is_multi: false,
        }
    }
}

/// Creation bundle for an explicit depth/stencil surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthStencilOptions {
    /// Comparison mode; None samples raw depth
    pub comparison_function: Option<CompareFunction>,
    /// Bilinear filtering when sampled
    pub bilinear_filtering: bool,
    /// Allocate stencil bits
    pub generate_stencil: bool,
    /// Six faces, matching a cube color surface
    pub is_cube: bool,
}
