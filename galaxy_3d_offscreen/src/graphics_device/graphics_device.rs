/// GraphicsDevice trait - the device operations a render target sequences

use std::sync::{Arc, Mutex};
use winit::dpi::PhysicalSize;
use crate::error::Result;
use crate::events::Observable;
use super::surface::{Surface, RenderTargetOptions, DepthStencilOptions};
use super::types::{Color4, ClearFlags, Extent2D, Viewport};

/// Device shared between the scene and every render target created from it
pub type SharedGraphicsDevice = Arc<Mutex<dyn GraphicsDevice>>;

/// Low-level graphics device
///
/// The currently bound framebuffer is process-wide state owned by the
/// device. `bind_framebuffer` / `unbind_framebuffer` are the only operations
/// that change it; callers must rebind explicitly and never assume a binding
/// survives across calls into other components.
///
/// Only surface creation can fail. Once a pass is started every other
/// operation runs to completion.
pub trait GraphicsDevice: Send {
    /// Allocate a flat color surface
    fn create_flat_surface(
        &mut self,
        size: Extent2D,
        options: &RenderTargetOptions,
    ) -> Result<Arc<dyn Surface>>;

    /// Allocate a cube color surface with six square faces of `size` pixels
    fn create_cube_surface(
        &mut self,
        size: u32,
        options: &RenderTargetOptions,
    ) -> Result<Arc<dyn Surface>>;

    /// Allocate a depth/stencil surface
    fn create_depth_stencil_surface(
        &mut self,
        size: Extent2D,
        options: &DepthStencilOptions,
    ) -> Result<Arc<dyn Surface>>;

    /// Attach a depth/stencil surface to the framebuffer of `surface`
    fn attach_depth_stencil(&mut self, surface: &Arc<dyn Surface>, depth_stencil: &Arc<dyn Surface>);

    /// Release a surface (color or depth/stencil). The handle must not be used afterwards.
    fn release_surface(&mut self, surface: &Arc<dyn Surface>);

    /// Release the framebuffer objects attached to `surface`, keeping its texels
    fn release_framebuffer_objects(&mut self, surface: &Arc<dyn Surface>);

    /// Bind `surface` as the active framebuffer
    ///
    /// `face` selects the cube face (None for flat surfaces). When
    /// `ignore_viewport` is set the full surface is used instead of the
    /// camera viewport.
    fn bind_framebuffer(
        &mut self,
        surface: &Arc<dyn Surface>,
        face: Option<u32>,
        ignore_viewport: bool,
        depth_stencil: Option<&Arc<dyn Surface>>,
    );

    /// Unbind `surface`, calling `on_complete` once the unbind has finished
    fn unbind_framebuffer(
        &mut self,
        surface: &Arc<dyn Surface>,
        is_cube: bool,
        on_complete: &mut dyn FnMut(),
    );

    /// Clear the bound framebuffer
    fn clear(&mut self, color: Option<Color4>, flags: ClearFlags);

    /// Set the viewport (normalized rect), optionally against an explicit pixel size
    fn set_viewport(&mut self, viewport: &Viewport, required: Option<Extent2D>);

    /// Generate the mip chain of all six faces of a cube surface
    fn generate_cube_mipmaps(&mut self, surface: &Arc<dyn Surface>);

    /// Reallocate `surface` multi-sampled. Returns the effective sample count,
    /// which may be lower than `requested` on limited hardware.
    fn update_sample_count(&mut self, surface: &Arc<dyn Surface>, requested: u32) -> u32;

    /// Read back RGBA8 pixels of the bound framebuffer
    fn read_pixels(&mut self, width: u32, height: u32) -> Result<Vec<u8>>;

    /// Current size of the main render viewport
    fn render_size(&self) -> PhysicalSize<u32>;

    /// Fires after the main render viewport has been resized
    fn resize_observable(&mut self) -> &mut Observable<PhysicalSize<u32>>;
}
