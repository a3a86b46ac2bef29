/// Drawable - a scene entity that can be drawn into a render target.
///
/// The scene owns its drawables in a SlotMap; render lists refer to them by
/// `EntityKey`. A drawable is made of sub-meshes, each dispatched separately
/// to the rendering-group dispatcher.

use slotmap::new_key_type;
use crate::camera::LAYER_MASK_ALL;

new_key_type! {
    /// Stable key for a Drawable within a Scene.
    ///
    /// Keys remain valid even after other drawables are removed.
    pub struct EntityKey;
}

// ===== FLAGS =====

/// Drawable takes part in rendering
pub const FLAG_ENABLED: u64 = 1 << 0;
/// Drawable is visible
pub const FLAG_VISIBLE: u64 = 1 << 1;
/// Drawable's resources (material, buffers) are ready to draw
pub const FLAG_READY: u64 = 1 << 2;
// Bits 3-63 reserved for future extensions

/// One drawable part (one material, one index range)
#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    pub index_count: u32,
}

impl SubMesh {
    pub fn new(index_count: u32) -> Self {
        Self { index_count }
    }
}

/// Reference to one sub-mesh of one drawable, as queued by a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubMeshRef {
    pub owner: EntityKey,
    pub index: usize,
}

/// A drawable scene entity
#[derive(Debug, Clone)]
pub struct Drawable {
    id: String,
    layer_mask: u32,
    flags: u64,
    sub_meshes: Vec<SubMesh>,
    pre_activated_render_id: Option<u64>,
    activated_render_id: Option<u64>,
    activation_count: u64,
}

impl Drawable {
    /// New enabled, visible, ready drawable matching every layer
    pub fn new(id: impl Into<String>, sub_meshes: Vec<SubMesh>) -> Self {
        Self {
            id: id.into(),
            layer_mask: LAYER_MASK_ALL,
            flags: FLAG_ENABLED | FLAG_VISIBLE | FLAG_READY,
            sub_meshes,
            pre_activated_render_id: None,
            activated_render_id: None,
            activation_count: 0,
        }
    }

    /// Stable user id, used by serialized render lists
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn layer_mask(&self) -> u32 {
        self.layer_mask
    }

    pub fn set_layer_mask(&mut self, mask: u32) {
        self.layer_mask = mask;
    }

    pub fn flags(&self) -> u64 {
        self.flags
    }

    fn set_flag(&mut self, flag: u64, value: bool) {
        if value {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.set_flag(FLAG_ENABLED, enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.flags & FLAG_ENABLED != 0
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.set_flag(FLAG_VISIBLE, visible);
    }

    pub fn is_visible(&self) -> bool {
        self.flags & FLAG_VISIBLE != 0
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.set_flag(FLAG_READY, ready);
    }

    pub fn is_ready(&self) -> bool {
        self.flags & FLAG_READY != 0
    }

    pub fn sub_meshes(&self) -> &[SubMesh] {
        &self.sub_meshes
    }

    pub fn sub_meshes_mut(&mut self) -> &mut Vec<SubMesh> {
        &mut self.sub_meshes
    }

    /// Render id of the last pre-activation
    pub fn pre_activated_render_id(&self) -> Option<u64> {
        self.pre_activated_render_id
    }

    /// Render id of the last activation
    pub fn activated_render_id(&self) -> Option<u64> {
        self.activated_render_id
    }

    /// Total number of activations
    pub fn activation_count(&self) -> u64 {
        self.activation_count
    }

    pub(crate) fn pre_activate(&mut self, render_id: u64) {
        self.pre_activated_render_id = Some(render_id);
    }

    pub(crate) fn activate(&mut self, render_id: u64) {
        self.activated_render_id = Some(render_id);
        self.activation_count += 1;
    }
}

#[cfg(test)]
#[path = "drawable_tests.rs"]
mod tests;
