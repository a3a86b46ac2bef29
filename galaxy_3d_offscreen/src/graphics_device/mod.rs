//! Graphics device collaborator
//!
//! The low-level device abstraction the offscreen layer drives: surface
//! allocation, framebuffer bind/unbind, clear, viewport, mipmaps and sample
//! counts. Backends implement `GraphicsDevice`; the layer only ever talks to
//! it through `SharedGraphicsDevice`.

mod graphics_device;
mod surface;
mod types;

// Mock graphics device for tests and headless tools (no GPU required)
pub mod mock_graphics_device;

pub use graphics_device::{GraphicsDevice, SharedGraphicsDevice};
pub use surface::{
    Surface, SurfaceId, RenderTargetOptions, DepthStencilOptions,
    TextureType, TextureFormat, SamplingMode, CompareFunction,
};
pub use types::{Color4, Extent2D, ClearFlags, Viewport};
