/// Rendering-group dispatcher seam.
///
/// A dispatcher batches sub-meshes into rendering groups (by material and
/// transparency) and draws them. Each render target owns its own instance,
/// created from the scene's prototype with `new_instance()`.

use std::cmp::Ordering;
use std::sync::Arc;
use super::drawable::{EntityKey, SubMeshRef};
use super::particle_system::ParticleSystem;

/// Sub-meshes queued for one draw, split by blending category
#[derive(Debug, Clone, Copy)]
pub struct RenderQueues<'a> {
    pub opaque: &'a [SubMeshRef],
    pub alpha_test: &'a [SubMeshRef],
    pub transparent: &'a [SubMeshRef],
    pub depth_only: &'a [SubMeshRef],
}

/// Replaces the dispatcher's built-in drawing of the queued sub-meshes
pub type CustomRenderFn = Arc<dyn Fn(&RenderQueues<'_>) + Send + Sync>;

/// Sort order of the sub-meshes within one rendering group
pub type SubMeshComparator = Arc<dyn Fn(&SubMeshRef, &SubMeshRef) -> Ordering + Send + Sync>;

/// Rendering-group sorter / dispatcher
pub trait RenderingGroupDispatcher: Send {
    /// Drop everything queued for the previous frame
    fn reset(&mut self);

    /// Queue one sub-mesh
    fn dispatch(&mut self, sub_mesh: SubMeshRef);

    /// Queue a particle system
    fn dispatch_particles(&mut self, system: &ParticleSystem);

    /// Draw the queued content
    fn render(
        &mut self,
        custom_render: Option<&CustomRenderFn>,
        render_list: &[EntityKey],
        render_particles: bool,
        render_sprites: bool,
    );

    /// Override the sort order of a rendering group
    fn set_rendering_order(
        &mut self,
        group: u32,
        opaque: Option<SubMeshComparator>,
        alpha_test: Option<SubMeshComparator>,
        transparent: Option<SubMeshComparator>,
    );

    /// Whether depth/stencil is cleared before drawing a rendering group
    fn set_auto_clear_depth_stencil(&mut self, group: u32, auto_clear: bool, depth: bool, stencil: bool);

    /// Release the per-group queues
    fn free_groups(&mut self);

    /// Fresh, empty dispatcher of the same kind
    fn new_instance(&self) -> Box<dyn RenderingGroupDispatcher>;
}
