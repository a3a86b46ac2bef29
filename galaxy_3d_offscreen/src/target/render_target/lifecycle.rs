/// Surface lifecycle: creation, resize, rebuild after device loss, dispose.
///
/// Old surfaces are always released before new ones are created, so a
/// resized target never holds two generations at once.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use glam::Mat4;
use crate::error::{Error, Result};
use crate::graphics_device::{CompareFunction, DepthStencilOptions, GraphicsDevice};
use crate::scene::SharedScene;
use crate::{engine_debug, engine_error, engine_warn};
use super::super::refresh_throttle::REFRESH_RATE_RENDER_ONCE;
use super::super::size_resolver::SizeSpec;
use super::{lock_device, lock_scene, RenderTarget, RenderTargetDesc};

impl RenderTarget {
    /// Create a render target drawing from `scene`
    ///
    /// Resolves the size against the device's current viewport, allocates
    /// the backing surface and subscribes to viewport resizes.
    ///
    /// # Errors
    ///
    /// `Error::AllocationFailed` if the device cannot create the surface.
    pub fn new(scene: &SharedScene, desc: RenderTargetDesc) -> Result<Self> {
        let (graphics_device, dispatcher) = {
            let scene = lock_scene(scene)?;
            (scene.graphics_device(), scene.create_rendering_dispatcher())
        };
        let size = desc.size.resolve(lock_device(&graphics_device)?.render_size());

        let mut target = Self::with_defaults(desc, Arc::downgrade(scene), graphics_device, dispatcher, size);
        {
            let flag = target.viewport_resized.clone();
            let mut device = lock_device(&target.graphics_device)?;
            target.resize_token = Some(device.resize_observable().add(move |_| {
                flag.store(true, Ordering::SeqCst);
            }));
        }

        if let Err(err) = target.allocate_surfaces() {
            target.dispose();
            return Err(err);
        }

        engine_debug!("galaxy3d::RenderTarget", "Created '{}' {}x{} (cube: {})",
            target.name, target.size.width, target.size.height, target.is_cube);
        Ok(target)
    }

    /// New target with the same name, current size, options, texture
    /// properties and explicit render list
    pub fn try_clone(&self) -> Result<RenderTarget> {
        let Some(scene) = self.scene.upgrade() else {
            return Err(Error::InvalidResource(format!("RenderTarget '{}' has no scene", self.name)));
        };
        let desc = RenderTargetDesc {
            name: self.name.clone(),
            size: SizeSpec::from(self.size),
            is_cube: self.is_cube,
            do_not_change_aspect_ratio: self.do_not_change_aspect_ratio,
            options: self.options.clone(),
        };
        let mut clone = RenderTarget::new(&scene, desc)?;
        clone.has_alpha = self.has_alpha;
        clone.level = self.level;
        clone.coordinates_mode = self.coordinates_mode;
        clone.set_render_list(self.render_list().map(|list| list.to_vec()));
        Ok(clone)
    }

    /// Release the backing surfaces and reallocate them for `size`
    ///
    /// Every other setting is kept. On failure the target is left without
    /// a backing surface and renders nothing until the next resize.
    pub fn resize(&mut self, size: SizeSpec) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        if self.scene.strong_count() == 0 {
            engine_debug!("galaxy3d::RenderTarget", "'{}': scene gone, resize skipped", self.name);
            return Ok(());
        }
        let device = self.graphics_device.clone();
        {
            let mut device = lock_device(&device)?;
            self.release_surfaces(&mut *device);
            self.size_spec = size;
            self.size = size.resolve(device.render_size());
        }
        self.needs_rebuild = false;
        self.allocate_surfaces()
    }

    /// Resize to the current size times `ratio` on both axes (at least 1 pixel)
    pub fn scale(&mut self, ratio: f32) -> Result<()> {
        let size = SizeSpec::from(self.size).scaled(ratio);
        self.resize(size)
    }

    /// Recover from a device loss
    ///
    /// A render-once target is only flagged: its counter is reset and the
    /// surfaces are reallocated by the next `render()`. Any other target is
    /// reallocated now. The owned post-process chain is rebuilt either way.
    pub fn rebuild(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        if let Some(chain) = self.post_process_chain.as_mut() {
            chain.rebuild();
        }
        if self.throttle.refresh_rate() == REFRESH_RATE_RENDER_ONCE {
            self.throttle.reset();
            self.needs_rebuild = true;
            return Ok(());
        }
        self.resize(self.size_spec)
    }

    /// Request a multi-sample count; the device's effective count is kept
    pub fn set_samples(&mut self, requested: u32) -> Result<()> {
        if self.samples == requested || self.disposed {
            return Ok(());
        }
        let Some(surface) = self.surface.clone() else {
            self.samples = requested;
            return Ok(());
        };
        let effective = lock_device(&self.graphics_device)?.update_sample_count(&surface, requested);
        if effective != requested {
            engine_warn!("galaxy3d::RenderTarget", "'{}': {} samples requested, device granted {}",
                self.name, requested, effective);
        }
        self.samples = effective;
        Ok(())
    }

    /// Create (or replace) the depth/stencil surface and attach it
    pub fn create_depth_stencil_surface(
        &mut self,
        comparison_function: Option<CompareFunction>,
        bilinear_filtering: bool,
        generate_stencil: bool,
    ) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        if self.scene.strong_count() == 0 {
            engine_debug!("galaxy3d::RenderTarget", "'{}': scene gone, depth/stencil skipped", self.name);
            return Ok(());
        }
        let options = DepthStencilOptions {
            comparison_function,
            bilinear_filtering,
            generate_stencil,
            is_cube: self.is_cube,
        };
        self.depth_stencil_options = Some(options);

        let device = self.graphics_device.clone();
        let mut device = lock_device(&device)?;
        if let Some(old) = self.depth_stencil.take() {
            device.release_surface(&old);
        }
        self.create_depth_stencil(&mut *device, &options)
    }

    /// Release the framebuffer objects of the backing surface, keeping its content
    pub fn dispose_framebuffer_objects(&mut self) -> Result<()> {
        if let Some(surface) = &self.surface {
            lock_device(&self.graphics_device)?.release_framebuffer_objects(surface);
        }
        Ok(())
    }

    /// Apply a pending viewport resize to a ratio-sized target
    ///
    /// Returns true if the target was reallocated.
    pub fn process_viewport_resize(&mut self) -> Result<bool> {
        if !self.viewport_resized.swap(false, Ordering::SeqCst) || !self.size_spec.is_ratio() {
            return Ok(false);
        }
        self.resize(self.size_spec)?;
        Ok(true)
    }

    /// Release every resource and unregister from the scene and its cameras
    ///
    /// Idempotent. Lock failures are logged; disposal continues.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        if let Some(mut chain) = self.post_process_chain.take() {
            chain.dispose();
        }

        let device = self.graphics_device.clone();
        match lock_device(&device) {
            Ok(mut device) => {
                if let Some(token) = self.resize_token.take() {
                    device.resize_observable().remove(token);
                }
                self.release_surfaces(&mut *device);
            }
            Err(err) => engine_error!("galaxy3d::RenderTarget", "'{}': dispose: {}", self.name, err),
        }

        self.render_list.clear();
        self.frame_list.clear();

        if let (Some(scene), Some(key)) = (self.scene.upgrade(), self.key) {
            match lock_scene(&scene) {
                Ok(mut scene) => {
                    scene.remove_custom_render_target(key);
                    for camera in scene.cameras_mut() {
                        camera.remove_custom_render_target(key);
                    }
                }
                Err(err) => engine_error!("galaxy3d::RenderTarget", "'{}': dispose: {}", self.name, err),
            }
        }
        engine_debug!("galaxy3d::RenderTarget", "Disposed '{}'", self.name);
    }

    // ===== INTERNALS =====

    /// Allocate the color surface, then sample count and depth/stencil
    fn allocate_surfaces(&mut self) -> Result<()> {
        let device = self.graphics_device.clone();
        let mut device = lock_device(&device)?;

        let created = if self.is_cube {
            device.create_cube_surface(self.size.width, &self.options)
        } else {
            device.create_flat_surface(self.size, &self.options)
        };
        let surface = match created {
            Ok(surface) => surface,
            Err(err) => {
                engine_error!("galaxy3d::RenderTarget", "'{}': cannot allocate {}x{} surface: {}",
                    self.name, self.size.width, self.size.height, err);
                return Err(Error::AllocationFailed(format!("RenderTarget '{}': {}", self.name, err)));
            }
        };

        if self.samples > 1 {
            let requested = self.samples;
            self.samples = device.update_sample_count(&surface, requested);
            if self.samples != requested {
                engine_warn!("galaxy3d::RenderTarget", "'{}': {} samples requested, device granted {}",
                    self.name, requested, self.samples);
            }
        }
        self.surface = Some(surface);
        if self.is_cube {
            self.reflection_texture_matrix = Some(Mat4::IDENTITY);
        }

        if let Some(options) = self.depth_stencil_options {
            self.create_depth_stencil(&mut *device, &options)?;
        }
        Ok(())
    }

    fn create_depth_stencil(&mut self, device: &mut dyn GraphicsDevice, options: &DepthStencilOptions) -> Result<()> {
        let depth_stencil = match device.create_depth_stencil_surface(self.size, options) {
            Ok(depth_stencil) => depth_stencil,
            Err(err) => {
                engine_error!("galaxy3d::RenderTarget", "'{}': cannot allocate depth/stencil: {}", self.name, err);
                // A target without its requested depth/stencil is inert
                if let Some(surface) = self.surface.take() {
                    device.release_surface(&surface);
                }
                return Err(Error::AllocationFailed(format!("RenderTarget '{}' depth/stencil: {}", self.name, err)));
            }
        };
        if let Some(surface) = &self.surface {
            device.attach_depth_stencil(surface, &depth_stencil);
        }
        self.depth_stencil = Some(depth_stencil);
        Ok(())
    }

    fn release_surfaces(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(depth_stencil) = self.depth_stencil.take() {
            device.release_surface(&depth_stencil);
        }
        if let Some(surface) = self.surface.take() {
            device.release_surface(&surface);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
