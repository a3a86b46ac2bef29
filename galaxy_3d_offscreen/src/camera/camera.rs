/// Camera - low-level passive data container.
///
/// The Camera computes nothing. The caller (game engine) is responsible
/// for computing and setting view and projection. Cameras live in the
/// scene's camera slotmap and are addressed by `CameraKey`.

use glam::Mat4;
use slotmap::new_key_type;
use crate::graphics_device::Viewport;
use crate::target::RenderTargetKey;

new_key_type! {
    /// Stable key of a camera inside its scene
    pub struct CameraKey;
}

/// Layer mask matching every entity
pub const LAYER_MASK_ALL: u32 = 0x0FFF_FFFF;

/// Low-level camera. A passive data container - computes nothing.
#[derive(Debug, Clone)]
pub struct Camera {
    name: String,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    viewport: Viewport,
    layer_mask: u32,
    custom_render_targets: Vec<RenderTargetKey>,
}

impl Camera {
    /// Create a new camera with a full-surface viewport and an all-layers mask.
    pub fn new(name: impl Into<String>, view: Mat4, projection: Mat4) -> Self {
        Self {
            name: name.into(),
            view_matrix: view,
            projection_matrix: projection,
            viewport: Viewport::default(),
            layer_mask: LAYER_MASK_ALL,
            custom_render_targets: Vec::new(),
        }
    }

    // ===== GETTERS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    /// View matrix (inverse of the camera's world transform).
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection matrix (perspective or orthographic).
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Projection re-fitted to `aspect` (width / height).
    ///
    /// Rescales the x axis so that the vertical field of view is kept.
    pub fn projection_with_aspect(&self, aspect: f32) -> Mat4 {
        let mut projection = self.projection_matrix;
        if aspect > 0.0 && projection.y_axis.y != 0.0 {
            projection.x_axis.x = projection.y_axis.y / aspect;
        }
        projection
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    /// Normalized viewport.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Entities whose layer mask shares no bit with this are not drawn.
    pub fn layer_mask(&self) -> u32 {
        self.layer_mask
    }

    /// Render targets rendered before this camera's own frame.
    pub fn custom_render_targets(&self) -> &[RenderTargetKey] {
        &self.custom_render_targets
    }

    // ===== SETTERS - store, compute nothing =====

    pub fn set_view(&mut self, matrix: Mat4) {
        self.view_matrix = matrix;
    }

    pub fn set_projection(&mut self, matrix: Mat4) {
        self.projection_matrix = matrix;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_layer_mask(&mut self, mask: u32) {
        self.layer_mask = mask;
    }

    /// Attach a render target. Attaching twice is a no-op.
    pub fn add_custom_render_target(&mut self, key: RenderTargetKey) {
        if !self.custom_render_targets.contains(&key) {
            self.custom_render_targets.push(key);
        }
    }

    /// Detach a render target. Returns false if it was not attached.
    pub fn remove_custom_render_target(&mut self, key: RenderTargetKey) -> bool {
        let before = self.custom_render_targets.len();
        self.custom_render_targets.retain(|k| *k != key);
        self.custom_render_targets.len() != before
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
