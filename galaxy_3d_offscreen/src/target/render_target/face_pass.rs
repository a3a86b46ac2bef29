/// Frame path: `render()` and the per-face pass.
///
/// Locks are never held across observer notifications: observers may lock
/// the scene or the device themselves. Lock order is scene, then device.

use std::sync::Arc;
use crate::camera::{Camera, CameraKey};
use crate::error::Result;
use crate::graphics_device::{ClearFlags, Surface};
use crate::{engine_debug, engine_error, engine_warn};
use crate::scene::{SharedScene, SubMeshRef};
use super::super::render_list::FrameListSource;
use super::{lock_device, lock_scene, RenderTarget};

/// RGBA8 pixels read back from a face, top row first
#[derive(Debug, Clone, PartialEq)]
pub struct FramebufferDump {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
}

impl RenderTarget {
    /// Number of face passes per render (6 for cube targets)
    pub fn face_count(&self) -> u32 {
        if self.is_cube { 6 } else { 1 }
    }

    /// Render the scene into this target
    ///
    /// `use_camera_post_process` routes the frame through the scene's shared
    /// post-process manager (unless overridden by
    /// `set_use_camera_post_processes`). `dump_for_debug` reads each face
    /// back into `last_debug_dump`.
    ///
    /// A target whose scene is gone, or that has no backing surface, renders
    /// nothing. Only lock poisoning is reported as an error.
    pub fn render(&mut self, use_camera_post_process: bool, dump_for_debug: bool) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        let Some(scene) = self.scene.upgrade() else {
            engine_debug!("galaxy3d::RenderTarget", "'{}': scene gone, render skipped", self.name);
            return Ok(());
        };
        let use_camera_post_process = self.use_camera_post_processes.unwrap_or(use_camera_post_process);

        if let Err(err) = self.process_viewport_resize() {
            engine_error!("galaxy3d::RenderTarget", "'{}': resize failed: {}", self.name, err);
            return Ok(());
        }
        if self.needs_rebuild {
            if let Err(err) = self.resize(self.size_spec) {
                engine_error!("galaxy3d::RenderTarget", "'{}': rebuild failed: {}", self.name, err);
                return Ok(());
            }
        }
        if self.surface.is_none() {
            engine_debug!("galaxy3d::RenderTarget", "'{}': no backing surface, render skipped", self.name);
            return Ok(());
        }

        self.render_list.resolve(&*lock_scene(&scene)?);

        self.on_before_bind.notify(&self.name);

        let camera = self.setup_camera(&scene)?;
        self.dispatch_frame(&scene, camera.as_ref().map(|(_, c)| c.layer_mask()))?;

        for face in 0..self.face_count() {
            self.render_face(&scene, face, use_camera_post_process, dump_for_debug)?;
            if self.is_cube {
                let mut scene = lock_scene(&scene)?;
                scene.increment_render_id();
                scene.reset_cached_material();
            }
        }

        self.on_after_unbind.notify(&self.name);

        self.restore_scene_camera(&scene)
    }

    /// Viewport and transform for the camera driving this render
    fn setup_camera(&mut self, scene: &SharedScene) -> Result<Option<(CameraKey, Camera)>> {
        let mut scene = lock_scene(scene)?;
        let scene_camera = scene.active_camera();
        let Some(key) = self.active_camera.or(scene_camera) else {
            return Ok(None);
        };
        let Some(camera) = scene.camera(key).cloned() else {
            engine_debug!("galaxy3d::RenderTarget", "'{}': camera no longer in scene", self.name);
            return Ok(None);
        };

        lock_device(&self.graphics_device)?.set_viewport(camera.viewport(), Some(self.size));
        if self.active_camera == Some(key) && scene_camera != Some(key) {
            scene.set_transform_matrix(*camera.view_matrix(), *camera.projection_matrix());
        }
        Ok(Some((key, camera)))
    }

    /// Reset the dispatcher and queue this frame's entities and particle systems
    fn dispatch_frame(&mut self, scene: &SharedScene, camera_layer_mask: Option<u32>) -> Result<()> {
        let mut scene = lock_scene(scene)?;
        self.dispatcher.reset();

        let source = self.render_list.fill_frame_list(&scene, &mut self.frame_list);
        let layer_mask = match source {
            FrameListSource::ActiveEntities => camera_layer_mask,
            FrameListSource::RenderList => None,
        };
        let render_id = scene.render_id();

        for &key in &self.frame_list {
            let Some(drawable) = scene.entity(key) else {
                continue;
            };
            if !drawable.is_ready() {
                self.throttle.reset();
                continue;
            }
            let masked = layer_mask.map_or(false, |mask| drawable.layer_mask() & mask == 0);
            let drawn = drawable.is_enabled()
                && drawable.is_visible()
                && !drawable.sub_meshes().is_empty()
                && !masked;
            let index_counts: Vec<u32> = if drawn {
                drawable.sub_meshes().iter().map(|s| s.index_count).collect()
            } else {
                Vec::new()
            };

            scene.pre_activate(key, render_id);
            if !drawn {
                continue;
            }
            scene.activate(key, render_id);
            for (index, index_count) in index_counts.into_iter().enumerate() {
                scene.add_active_indices(index_count);
                self.dispatcher.dispatch(SubMeshRef { owner: key, index });
            }
        }

        for system in scene.particle_systems() {
            if !system.is_started() {
                continue;
            }
            let Some(emitter) = system.emitter() else {
                continue;
            };
            let emitter_enabled = scene.entity(emitter).map_or(false, |e| e.is_enabled());
            if emitter_enabled && self.frame_list.contains(&emitter) {
                self.dispatcher.dispatch_particles(system);
            }
        }
        Ok(())
    }

    /// One face pass: bind, clear, draw, post-process, unbind
    fn render_face(
        &mut self,
        scene: &SharedScene,
        face: u32,
        use_camera_post_process: bool,
        dump_for_debug: bool,
    ) -> Result<()> {
        let Some(surface) = self.surface.clone() else {
            return Ok(());
        };

        // Bind
        self.bind(scene, &surface, face, use_camera_post_process)?;

        self.on_before_render.notify(&face);

        // Clear
        if self.on_clear.has_observers() {
            self.on_clear.notify(&self.graphics_device);
        } else {
            let color = match self.clear_color {
                Some(color) => color,
                None => lock_scene(scene)?.clear_color(),
            };
            lock_device(&self.graphics_device)?.clear(Some(color), ClearFlags::all());
        }

        // Draw, with the scene projection fitted to this target
        let aspect = self.size.aspect_ratio();
        if !self.do_not_change_aspect_ratio {
            lock_scene(scene)?.update_transform_matrix(aspect);
        }

        self.dispatcher.render(
            self.custom_render_function.as_ref(),
            &self.frame_list,
            self.render_particles,
            self.render_sprites,
        );

        // Post-process
        if let Some(chain) = self.post_process_chain.as_mut() {
            chain.finalize_frame(&surface, face, self.ignore_camera_viewport);
        } else if use_camera_post_process {
            lock_scene(scene)?.post_process_manager_mut().finalize_frame(false, &surface, face, None, false);
        }

        if !self.do_not_change_aspect_ratio {
            lock_scene(scene)?.update_transform_matrix(aspect);
        }

        if dump_for_debug {
            self.dump_framebuffer();
        }

        // Unbind; the cube stays bound until its last face
        if !self.is_cube || face == self.face_count() - 1 {
            let mut completed = false;
            {
                let mut device = lock_device(&self.graphics_device)?;
                if self.is_cube {
                    device.generate_cube_mipmaps(&surface);
                }
                device.unbind_framebuffer(&surface, self.is_cube, &mut || completed = true);
            }
            if completed {
                self.on_after_render.notify(&face);
            }
        } else {
            self.on_after_render.notify(&face);
        }
        Ok(())
    }

    fn bind(
        &mut self,
        scene: &SharedScene,
        surface: &Arc<dyn Surface>,
        face: u32,
        use_camera_post_process: bool,
    ) -> Result<()> {
        if let Some(chain) = self.post_process_chain.as_mut() {
            chain.prepare_frame(surface);
            return Ok(());
        }
        let prepared = use_camera_post_process
            && lock_scene(scene)?.post_process_manager_mut().prepare_frame(surface, None);
        if !prepared {
            let face = self.is_cube.then_some(face);
            lock_device(&self.graphics_device)?.bind_framebuffer(
                surface,
                face,
                self.ignore_camera_viewport,
                self.depth_stencil.as_ref(),
            );
        }
        Ok(())
    }

    /// Put the scene's own camera viewport and transform back
    fn restore_scene_camera(&mut self, scene: &SharedScene) -> Result<()> {
        let mut scene = lock_scene(scene)?;
        if let Some(key) = scene.active_camera() {
            if let Some(camera) = scene.camera(key).cloned() {
                if self.active_camera.is_some() && self.active_camera != Some(key) {
                    let projection = camera.projection_with_aspect(self.device_aspect()?);
                    scene.set_transform_matrix(*camera.view_matrix(), projection);
                }
                lock_device(&self.graphics_device)?.set_viewport(camera.viewport(), None);
            }
        }
        scene.reset_cached_material();
        Ok(())
    }

    fn device_aspect(&self) -> Result<f32> {
        let size = lock_device(&self.graphics_device)?.render_size();
        Ok(crate::graphics_device::Extent2D::new(size.width, size.height).aspect_ratio())
    }

    /// Read back the bound framebuffer. Failures are logged, never returned.
    fn dump_framebuffer(&mut self) {
        let (width, height) = (self.size.width, self.size.height);
        let bytes = match lock_device(&self.graphics_device).and_then(|mut d| d.read_pixels(width, height)) {
            Ok(bytes) => bytes,
            Err(err) => {
                engine_warn!("galaxy3d::RenderTarget", "'{}': debug dump failed: {}", self.name, err);
                return;
            }
        };
        let pixels = match bytemuck::try_cast_slice::<u8, [u8; 4]>(&bytes) {
            Ok(pixels) if pixels.len() == width as usize * height as usize => pixels,
            _ => {
                engine_warn!("galaxy3d::RenderTarget",
                    "'{}': debug dump has {} bytes, expected {}", self.name, bytes.len(), width as usize * height as usize * 4);
                return;
            }
        };
        let flipped = pixels
            .chunks(width.max(1) as usize)
            .rev()
            .flatten()
            .copied()
            .collect();
        self.last_debug_dump = Some(FramebufferDump { width, height, pixels: flipped });
    }
}

#[cfg(test)]
#[path = "face_pass_tests.rs"]
mod tests;
