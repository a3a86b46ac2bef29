/// Scene - the entities, cameras and shared collaborators render targets draw from.
///
/// Uses SlotMaps for O(1) insert/remove with stable keys. Iteration order
/// of entities is insertion order, kept in a separate key list.
/// Scenes are shared as `Arc<Mutex<Scene>>`; render targets only keep a
/// `Weak` back-reference.

use std::sync::{Arc, Mutex};
use bitflags::bitflags;
use glam::Mat4;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::camera::{Camera, CameraKey};
use crate::graphics_device::{Color4, SharedGraphicsDevice};
use crate::target::RenderTargetKey;
use super::drawable::{Drawable, EntityKey};
use super::particle_system::ParticleSystem;
use super::post_process::PostProcessManager;
use super::rendering_group::RenderingGroupDispatcher;

/// Scene shared between its owner and the render targets created from it
pub type SharedScene = Arc<Mutex<Scene>>;

bitflags! {
    /// Material state to recompute on the next draw
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MaterialDirtyFlags: u32 {
        const TEXTURE = 1 << 0;
        const LIGHT = 1 << 1;
        const FRESNEL = 1 << 2;
        const ATTRIBUTE = 1 << 3;
        const MISC = 1 << 4;
    }
}

pub struct Scene {
    /// Graphics device shared with every render target of this scene
    graphics_device: SharedGraphicsDevice,
    entities: SlotMap<EntityKey, Drawable>,
    /// Insertion order of `entities`
    entity_order: Vec<EntityKey>,
    /// Entity id -> first entity registered with that id
    entity_ids: FxHashMap<String, EntityKey>,
    /// Entities that passed the main view's visibility evaluation
    active_entities: Vec<EntityKey>,
    cameras: SlotMap<CameraKey, Camera>,
    active_camera: Option<CameraKey>,
    particle_systems: Vec<ParticleSystem>,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    transform_matrix: Mat4,
    render_id: u64,
    active_indices: u64,
    cached_material: Option<u64>,
    material_dirty_flags: MaterialDirtyFlags,
    clear_color: Color4,
    post_process_manager: Box<dyn PostProcessManager>,
    dispatcher_prototype: Box<dyn RenderingGroupDispatcher>,
    custom_render_targets: Vec<RenderTargetKey>,
}

impl Scene {
    /// Create a new empty scene
    ///
    /// # Arguments
    ///
    /// * `graphics_device` - Device all render targets of this scene allocate from
    /// * `dispatcher_prototype` - Rendering-group dispatcher; each render target gets a fresh instance
    /// * `post_process_manager` - Shared (camera) post-process chain executor
    pub fn new(
        graphics_device: SharedGraphicsDevice,
        dispatcher_prototype: Box<dyn RenderingGroupDispatcher>,
        post_process_manager: Box<dyn PostProcessManager>,
    ) -> Self {
        Self {
            graphics_device,
            entities: SlotMap::with_key(),
            entity_order: Vec::new(),
            entity_ids: FxHashMap::default(),
            active_entities: Vec::new(),
            cameras: SlotMap::with_key(),
            active_camera: None,
            particle_systems: Vec::new(),
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            transform_matrix: Mat4::IDENTITY,
            render_id: 0,
            active_indices: 0,
            cached_material: None,
            material_dirty_flags: MaterialDirtyFlags::empty(),
            clear_color: Color4::default(),
            post_process_manager,
            dispatcher_prototype,
            custom_render_targets: Vec::new(),
        }
    }

    /// Wrap into the shared handle render targets are created from
    pub fn into_shared(self) -> SharedScene {
        Arc::new(Mutex::new(self))
    }

    pub fn graphics_device(&self) -> SharedGraphicsDevice {
        self.graphics_device.clone()
    }

    // ===== ENTITIES =====

    /// Add a drawable. Returns a stable key valid until the drawable is removed.
    pub fn add_entity(&mut self, drawable: Drawable) -> EntityKey {
        let id = drawable.id().to_string();
        let key = self.entities.insert(drawable);
        self.entity_order.push(key);
        self.entity_ids.entry(id).or_insert(key);
        key
    }

    /// Remove a drawable and drop it from the active set
    pub fn remove_entity(&mut self, key: EntityKey) -> Option<Drawable> {
        let drawable = self.entities.remove(key)?;
        self.entity_order.retain(|k| *k != key);
        self.active_entities.retain(|k| *k != key);
        if self.entity_ids.get(drawable.id()) == Some(&key) {
            self.entity_ids.remove(drawable.id());
            // Promote the next entity carrying the same id
            let next = self.entity_order.iter()
                .copied()
                .find(|k| self.entities.get(*k).map(|d| d.id()) == Some(drawable.id()));
            if let Some(next) = next {
                self.entity_ids.insert(drawable.id().to_string(), next);
            }
        }
        Some(drawable)
    }

    pub fn entity(&self, key: EntityKey) -> Option<&Drawable> {
        self.entities.get(key)
    }

    pub fn entity_mut(&mut self, key: EntityKey) -> Option<&mut Drawable> {
        self.entities.get_mut(key)
    }

    /// Entity keys in insertion order
    pub fn entity_keys(&self) -> &[EntityKey] {
        &self.entity_order
    }

    /// Look up the first entity registered with `id`
    pub fn entity_by_id(&self, id: &str) -> Option<EntityKey> {
        self.entity_ids.get(id).copied()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Replace the active entity set (computed by the main view each frame)
    pub fn set_active_entities(&mut self, keys: Vec<EntityKey>) {
        self.active_entities = keys;
    }

    pub fn active_entities(&self) -> &[EntityKey] {
        &self.active_entities
    }

    /// Record that `key` was considered for drawing during `render_id`
    pub fn pre_activate(&mut self, key: EntityKey, render_id: u64) {
        if let Some(drawable) = self.entities.get_mut(key) {
            drawable.pre_activate(render_id);
        }
    }

    /// Record that `key` was drawn during `render_id`
    pub fn activate(&mut self, key: EntityKey, render_id: u64) {
        if let Some(drawable) = self.entities.get_mut(key) {
            drawable.activate(render_id);
        }
    }

    /// Add to the active index counter (frame statistics)
    pub fn add_active_indices(&mut self, count: u32) {
        self.active_indices += count as u64;
    }

    pub fn active_indices(&self) -> u64 {
        self.active_indices
    }

    pub fn reset_active_indices(&mut self) {
        self.active_indices = 0;
    }

    // ===== PARTICLES =====

    pub fn add_particle_system(&mut self, system: ParticleSystem) -> usize {
        self.particle_systems.push(system);
        self.particle_systems.len() - 1
    }

    pub fn particle_systems(&self) -> &[ParticleSystem] {
        &self.particle_systems
    }

    pub fn particle_systems_mut(&mut self) -> &mut [ParticleSystem] {
        &mut self.particle_systems
    }

    // ===== CAMERAS =====

    pub fn add_camera(&mut self, camera: Camera) -> CameraKey {
        self.cameras.insert(camera)
    }

    pub fn remove_camera(&mut self, key: CameraKey) -> Option<Camera> {
        if self.active_camera == Some(key) {
            self.active_camera = None;
        }
        self.cameras.remove(key)
    }

    pub fn camera(&self, key: CameraKey) -> Option<&Camera> {
        self.cameras.get(key)
    }

    pub fn camera_mut(&mut self, key: CameraKey) -> Option<&mut Camera> {
        self.cameras.get_mut(key)
    }

    pub fn cameras_mut(&mut self) -> impl Iterator<Item = &mut Camera> + '_ {
        self.cameras.values_mut()
    }

    /// Camera the main view renders from
    pub fn active_camera(&self) -> Option<CameraKey> {
        self.active_camera
    }

    pub fn set_active_camera(&mut self, key: Option<CameraKey>) {
        self.active_camera = key;
    }

    // ===== TRANSFORM =====

    /// Set the scene's current view and projection
    pub fn set_transform_matrix(&mut self, view: Mat4, projection: Mat4) {
        self.view_matrix = view;
        self.projection_matrix = projection;
        self.transform_matrix = projection * view;
    }

    /// Recompute the view/projection from the active camera, fitted to `aspect`
    pub fn update_transform_matrix(&mut self, aspect: f32) {
        let Some(camera) = self.active_camera.and_then(|k| self.cameras.get(k)) else {
            return;
        };
        let view = *camera.view_matrix();
        let projection = camera.projection_with_aspect(aspect);
        self.set_transform_matrix(view, projection);
    }

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// projection * view
    pub fn transform_matrix(&self) -> &Mat4 {
        &self.transform_matrix
    }

    // ===== FRAME STATE =====

    /// Id of the current render, bumped between cube faces
    pub fn render_id(&self) -> u64 {
        self.render_id
    }

    pub fn increment_render_id(&mut self) {
        self.render_id += 1;
    }

    /// Material bound by the last draw
    pub fn cached_material(&self) -> Option<u64> {
        self.cached_material
    }

    pub fn set_cached_material(&mut self, material: Option<u64>) {
        self.cached_material = material;
    }

    /// Forget the last bound material so the next draw rebinds it
    pub fn reset_cached_material(&mut self) {
        self.cached_material = None;
    }

    /// Flag every material for recomputation of `flags`
    pub fn mark_all_materials_as_dirty(&mut self, flags: MaterialDirtyFlags) {
        self.material_dirty_flags |= flags;
    }

    /// Pending dirty flags, cleared by the call
    pub fn take_material_dirty_flags(&mut self) -> MaterialDirtyFlags {
        std::mem::replace(&mut self.material_dirty_flags, MaterialDirtyFlags::empty())
    }

    pub fn clear_color(&self) -> Color4 {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color4) {
        self.clear_color = color;
    }

    // ===== COLLABORATORS =====

    /// Shared (camera) post-process chain executor
    pub fn post_process_manager_mut(&mut self) -> &mut dyn PostProcessManager {
        self.post_process_manager.as_mut()
    }

    /// Fresh post-process manager for a render target's own chain
    pub fn create_post_process_manager(&self) -> Box<dyn PostProcessManager> {
        self.post_process_manager.new_instance()
    }

    /// Fresh rendering-group dispatcher for a render target
    pub fn create_rendering_dispatcher(&self) -> Box<dyn RenderingGroupDispatcher> {
        self.dispatcher_prototype.new_instance()
    }

    // ===== RENDER TARGET REGISTRY =====

    /// Render targets rendered before the scene's cameras. Registering twice is a no-op.
    pub fn add_custom_render_target(&mut self, key: RenderTargetKey) {
        if !self.custom_render_targets.contains(&key) {
            self.custom_render_targets.push(key);
        }
    }

    pub fn remove_custom_render_target(&mut self, key: RenderTargetKey) -> bool {
        let before = self.custom_render_targets.len();
        self.custom_render_targets.retain(|k| *k != key);
        self.custom_render_targets.len() != before
    }

    pub fn custom_render_targets(&self) -> &[RenderTargetKey] {
        &self.custom_render_targets
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
