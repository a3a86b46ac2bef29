/// Render target - an offscreen surface a scene is rendered into.
///
/// A render target owns a flat or cube color surface (plus an optional
/// depth/stencil surface and post-process chain), decides per frame whether
/// to redraw, resolves which entities to draw, and sequences the device
/// through one face pass per face.
///
/// The frame path lives in `face_pass`, surface management in `lifecycle`
/// and save/load in `serialization`.

mod face_pass;
mod lifecycle;
mod serialization;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use crate::camera::CameraKey;
use crate::error::{poisoned, Result};
use crate::events::{Observable, ObserverToken};
use crate::graphics_device::{
    Color4, DepthStencilOptions, Extent2D, GraphicsDevice, RenderTargetOptions,
    SamplingMode, SharedGraphicsDevice, Surface,
};
use crate::scene::{
    CustomRenderFn, EntityKey, PostProcess, RenderingGroupDispatcher, Scene, SharedScene,
    SubMeshComparator,
};
use super::post_process_chain::PostProcessChain;
use super::refresh_throttle::{RefreshThrottle, REFRESH_RATE_RENDER_ON_EVERY_FRAME};
use super::render_list::{RenderListPredicate, RenderListResolver};
use super::size_resolver::SizeSpec;
use super::target_manager::RenderTargetKey;

pub use face_pass::FramebufferDump;
pub use serialization::SerializedRenderTarget;

/// Texture coordinates generation mode used when the target is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatesMode {
    Explicit,
    Spherical,
    Planar,
    Cubic,
    Projection,
    Skybox,
    InvCubic,
    Equirectangular,
}

/// Texture addressing outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapMode {
    Wrap,
    Clamp,
    Mirror,
}

/// Render target descriptor
#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    /// Name, unique within a `TargetManager`. Unnamed targets are not serialized.
    pub name: String,
    pub size: SizeSpec,
    /// Six-face cube target; fixed for the target's lifetime
    pub is_cube: bool,
    /// Keep the scene projection as is instead of fitting it to the target
    pub do_not_change_aspect_ratio: bool,
    pub options: RenderTargetOptions,
}

impl Default for RenderTargetDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: SizeSpec::Square(256),
            is_cube: false,
            do_not_change_aspect_ratio: true,
            options: RenderTargetOptions::default(),
        }
    }
}

pub(crate) fn lock_device(device: &SharedGraphicsDevice) -> Result<MutexGuard<'_, dyn GraphicsDevice + 'static>> {
    device.lock().map_err(|_| poisoned("GraphicsDevice"))
}

pub(crate) fn lock_scene(scene: &Mutex<Scene>) -> Result<MutexGuard<'_, Scene>> {
    scene.lock().map_err(|_| poisoned("Scene"))
}

/// Offscreen render target
pub struct RenderTarget {
    name: String,
    key: Option<RenderTargetKey>,
    scene: Weak<Mutex<Scene>>,
    graphics_device: SharedGraphicsDevice,

    size_spec: SizeSpec,
    size: Extent2D,
    is_cube: bool,
    options: RenderTargetOptions,
    surface: Option<Arc<dyn Surface>>,
    depth_stencil: Option<Arc<dyn Surface>>,
    depth_stencil_options: Option<DepthStencilOptions>,
    samples: u32,
    needs_rebuild: bool,
    disposed: bool,

    level: f32,
    has_alpha: bool,
    coordinates_mode: CoordinatesMode,
    wrap_u: WrapMode,
    wrap_v: WrapMode,
    reflection_texture_matrix: Option<Mat4>,
    bounding_box_size: Option<Vec3>,
    bounding_box_position: Vec3,

    throttle: RefreshThrottle,
    render_list: RenderListResolver,
    /// Entities of the current frame, reused across frames
    frame_list: Vec<EntityKey>,
    dispatcher: Box<dyn RenderingGroupDispatcher>,
    post_process_chain: Option<PostProcessChain>,
    active_camera: Option<CameraKey>,
    clear_color: Option<Color4>,
    custom_render_function: Option<CustomRenderFn>,
    use_camera_post_processes: Option<bool>,
    ignore_camera_viewport: bool,
    do_not_change_aspect_ratio: bool,
    render_particles: bool,
    render_sprites: bool,
    last_debug_dump: Option<FramebufferDump>,

    /// Set by the device resize listener, consumed on the next render
    viewport_resized: Arc<AtomicBool>,
    resize_token: Option<ObserverToken>,

    on_before_bind: Observable<str>,
    on_after_unbind: Observable<str>,
    on_before_render: Observable<u32>,
    on_after_render: Observable<u32>,
    on_clear: Observable<SharedGraphicsDevice>,
    after_unbind_token: Option<ObserverToken>,
    before_render_token: Option<ObserverToken>,
    after_render_token: Option<ObserverToken>,
    clear_token: Option<ObserverToken>,
}

impl RenderTarget {
    // ===== IDENTITY =====

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key in the owning `TargetManager`, None until inserted
    pub fn key(&self) -> Option<RenderTargetKey> {
        self.key
    }

    pub(crate) fn set_key(&mut self, key: Option<RenderTargetKey>) {
        self.key = key;
    }

    /// Owning scene, None once it has been dropped
    pub fn scene(&self) -> Option<SharedScene> {
        self.scene.upgrade()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ===== SIZE AND SURFACES =====

    pub fn size_spec(&self) -> SizeSpec {
        self.size_spec
    }

    /// Resolved pixel size
    pub fn render_size(&self) -> Extent2D {
        self.size
    }

    pub fn render_width(&self) -> u32 {
        self.size.width
    }

    pub fn render_height(&self) -> u32 {
        self.size.height
    }

    pub fn is_cube(&self) -> bool {
        self.is_cube
    }

    pub fn options(&self) -> &RenderTargetOptions {
        &self.options
    }

    /// Backing color surface, None after a failed allocation or dispose
    pub fn surface(&self) -> Option<&Arc<dyn Surface>> {
        self.surface.as_ref()
    }

    pub fn depth_stencil_surface(&self) -> Option<&Arc<dyn Surface>> {
        self.depth_stencil.as_ref()
    }

    /// Effective multi-sample count
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Render targets can always be rescaled
    pub fn can_rescale(&self) -> bool {
        true
    }

    // ===== TEXTURE PROPERTIES =====

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn set_level(&mut self, level: f32) {
        self.level = level;
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn set_has_alpha(&mut self, has_alpha: bool) {
        self.has_alpha = has_alpha;
    }

    pub fn coordinates_mode(&self) -> CoordinatesMode {
        self.coordinates_mode
    }

    pub fn set_coordinates_mode(&mut self, mode: CoordinatesMode) {
        self.coordinates_mode = mode;
    }

    pub fn wrap_u(&self) -> WrapMode {
        self.wrap_u
    }

    pub fn wrap_v(&self) -> WrapMode {
        self.wrap_v
    }

    /// Identity for cube targets, None for flat ones
    pub fn reflection_texture_matrix(&self) -> Option<&Mat4> {
        self.reflection_texture_matrix.as_ref()
    }

    /// Half-extent of the local reflection volume (cube probes)
    pub fn bounding_box_size(&self) -> Option<Vec3> {
        self.bounding_box_size
    }

    /// Switch a cube target to local reflections, or back to infinite ones with None
    ///
    /// Every scene material is marked texture-dirty so cached reflection
    /// coefficients are recomputed.
    pub fn set_bounding_box_size(&mut self, size: Option<Vec3>) -> Result<()> {
        if self.bounding_box_size == size {
            return Ok(());
        }
        self.bounding_box_size = size;
        if let Some(scene) = self.scene.upgrade() {
            lock_scene(&scene)?.mark_all_materials_as_dirty(crate::scene::MaterialDirtyFlags::TEXTURE);
        }
        Ok(())
    }

    pub fn bounding_box_position(&self) -> Vec3 {
        self.bounding_box_position
    }

    pub fn set_bounding_box_position(&mut self, position: Vec3) {
        self.bounding_box_position = position;
    }

    // ===== REFRESH =====

    pub fn refresh_rate(&self) -> u32 {
        self.throttle.refresh_rate()
    }

    /// Change the refresh rate. The next `should_render` is always true.
    pub fn set_refresh_rate(&mut self, refresh_rate: u32) {
        self.throttle.set_refresh_rate(refresh_rate);
    }

    /// Force a render on the next frame
    pub fn reset_refresh_counter(&mut self) {
        self.throttle.reset();
    }

    /// Per-frame throttle decision. Advances the counter.
    pub fn should_render(&mut self) -> bool {
        self.throttle.should_render()
    }

    // ===== RENDER LIST =====

    /// Explicit (or predicate-built, or id-resolved) render list
    pub fn render_list(&self) -> Option<&[EntityKey]> {
        self.render_list.render_list()
    }

    /// Set the explicit render list; None draws the scene's active entities
    pub fn set_render_list(&mut self, list: Option<Vec<EntityKey>>) {
        self.render_list.set_render_list(list);
    }

    /// Rebuild the render list from `predicate` on every render
    pub fn set_render_list_predicate(&mut self, predicate: Option<RenderListPredicate>) {
        self.render_list.set_predicate(predicate);
    }

    /// Render list given as entity ids, resolved on the next render
    pub fn set_pending_render_list_ids(&mut self, ids: Vec<String>) {
        self.render_list.set_pending_ids(ids);
    }

    pub fn pending_render_list_ids(&self) -> Option<&[String]> {
        self.render_list.pending_ids()
    }

    // ===== FRAME CONFIGURATION =====

    /// Camera this target renders from instead of the scene's active camera
    pub fn active_camera(&self) -> Option<CameraKey> {
        self.active_camera
    }

    pub fn set_active_camera(&mut self, camera: Option<CameraKey>) {
        self.active_camera = camera;
    }

    /// Clear color; None uses the scene's
    pub fn clear_color(&self) -> Option<Color4> {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Option<Color4>) {
        self.clear_color = color;
    }

    pub fn set_custom_render_function(&mut self, function: Option<CustomRenderFn>) {
        self.custom_render_function = function;
    }

    /// Overrides the `use_camera_post_process` argument of `render`
    pub fn use_camera_post_processes(&self) -> Option<bool> {
        self.use_camera_post_processes
    }

    pub fn set_use_camera_post_processes(&mut self, value: Option<bool>) {
        self.use_camera_post_processes = value;
    }

    pub fn ignore_camera_viewport(&self) -> bool {
        self.ignore_camera_viewport
    }

    pub fn set_ignore_camera_viewport(&mut self, value: bool) {
        self.ignore_camera_viewport = value;
    }

    pub fn do_not_change_aspect_ratio(&self) -> bool {
        self.do_not_change_aspect_ratio
    }

    pub fn set_do_not_change_aspect_ratio(&mut self, value: bool) {
        self.do_not_change_aspect_ratio = value;
    }

    pub fn render_particles(&self) -> bool {
        self.render_particles
    }

    pub fn set_render_particles(&mut self, value: bool) {
        self.render_particles = value;
    }

    pub fn render_sprites(&self) -> bool {
        self.render_sprites
    }

    pub fn set_render_sprites(&mut self, value: bool) {
        self.render_sprites = value;
    }

    /// Pixels captured by the last `render(_, true)`
    pub fn last_debug_dump(&self) -> Option<&FramebufferDump> {
        self.last_debug_dump.as_ref()
    }

    // ===== RENDERING GROUPS =====

    /// Override the sort order of one rendering group
    pub fn set_rendering_order(
        &mut self,
        group: u32,
        opaque: Option<SubMeshComparator>,
        alpha_test: Option<SubMeshComparator>,
        transparent: Option<SubMeshComparator>,
    ) {
        self.dispatcher.set_rendering_order(group, opaque, alpha_test, transparent);
    }

    /// Whether depth/stencil is cleared before drawing one rendering group
    pub fn set_rendering_auto_clear_depth_stencil(&mut self, group: u32, auto_clear: bool) {
        self.dispatcher.set_auto_clear_depth_stencil(group, auto_clear, true, true);
    }

    pub fn free_rendering_groups(&mut self) {
        self.dispatcher.free_groups();
    }

    // ===== POST-PROCESS CHAIN =====

    /// Stages of the owned chain (empty when there is none)
    pub fn post_process_stages(&self) -> &[Arc<dyn PostProcess>] {
        match &self.post_process_chain {
            Some(chain) => chain.stages(),
            None => &[],
        }
    }

    /// Add a stage to the owned chain, creating the chain on first use
    pub fn add_post_process_stage(&mut self, stage: Arc<dyn PostProcess>, index: Option<usize>) -> Result<()> {
        if self.post_process_chain.is_none() {
            let Some(scene) = self.scene.upgrade() else {
                crate::engine_debug!("galaxy3d::RenderTarget",
                    "'{}': scene gone, post-process stage not added", self.name);
                return Ok(());
            };
            let manager = lock_scene(&scene)?.create_post_process_manager();
            self.post_process_chain = Some(PostProcessChain::new(manager));
        }
        if let Some(chain) = self.post_process_chain.as_mut() {
            chain.add(stage, index);
        }
        Ok(())
    }

    /// Remove a stage from the owned chain. Returns false if it was not there.
    pub fn remove_post_process_stage(&mut self, stage: &Arc<dyn PostProcess>) -> bool {
        self.post_process_chain.as_mut().map_or(false, |chain| chain.remove(stage))
    }

    /// Remove every stage, disposing them when `dispose` is set
    pub fn clear_post_process_stages(&mut self, dispose: bool) {
        if let Some(chain) = self.post_process_chain.as_mut() {
            chain.clear(dispose);
        }
    }

    // ===== EVENTS =====

    /// Fires once per render, before the camera is set up. Receives the target name.
    pub fn on_before_bind(&mut self) -> &mut Observable<str> {
        &mut self.on_before_bind
    }

    /// Fires once per render, after every face. Receives the target name.
    pub fn on_after_unbind(&mut self) -> &mut Observable<str> {
        &mut self.on_after_unbind
    }

    /// Fires after bind, before clear, with the face index
    pub fn on_before_render(&mut self) -> &mut Observable<u32> {
        &mut self.on_before_render
    }

    /// Fires once a face is done, with the face index
    pub fn on_after_render(&mut self) -> &mut Observable<u32> {
        &mut self.on_after_render
    }

    /// When observed, replaces the device clear of each face
    pub fn on_clear(&mut self) -> &mut Observable<SharedGraphicsDevice> {
        &mut self.on_clear
    }

    pub fn set_on_after_unbind<F>(&mut self, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.after_unbind_token = Some(self.on_after_unbind.replace(self.after_unbind_token, callback));
    }

    pub fn set_on_before_render<F>(&mut self, callback: F)
    where
        F: FnMut(&u32) + Send + 'static,
    {
        self.before_render_token = Some(self.on_before_render.replace(self.before_render_token, callback));
    }

    pub fn set_on_after_render<F>(&mut self, callback: F)
    where
        F: FnMut(&u32) + Send + 'static,
    {
        self.after_render_token = Some(self.on_after_render.replace(self.after_render_token, callback));
    }

    pub fn set_on_clear<F>(&mut self, callback: F)
    where
        F: FnMut(&SharedGraphicsDevice) + Send + 'static,
    {
        self.clear_token = Some(self.on_clear.replace(self.clear_token, callback));
    }

    // ===== CONSTRUCTION HELPERS =====

    fn wrap_for(sampling_mode: SamplingMode) -> WrapMode {
        match sampling_mode {
            SamplingMode::Nearest => WrapMode::Clamp,
            _ => WrapMode::Wrap,
        }
    }

    fn default_coordinates_mode(is_cube: bool) -> CoordinatesMode {
        if is_cube {
            CoordinatesMode::InvCubic
        } else {
            CoordinatesMode::Projection
        }
    }

    fn with_defaults(
        desc: RenderTargetDesc,
        scene: Weak<Mutex<Scene>>,
        graphics_device: SharedGraphicsDevice,
        dispatcher: Box<dyn RenderingGroupDispatcher>,
        size: Extent2D,
    ) -> Self {
        let wrap = Self::wrap_for(desc.options.sampling_mode);
        Self {
            name: desc.name,
            key: None,
            scene,
            graphics_device,
            size_spec: desc.size,
            size,
            is_cube: desc.is_cube,
            options: desc.options,
            surface: None,
            depth_stencil: None,
            depth_stencil_options: None,
            samples: 1,
            needs_rebuild: false,
            disposed: false,
            level: 1.0,
            has_alpha: false,
            coordinates_mode: Self::default_coordinates_mode(desc.is_cube),
            wrap_u: wrap,
            wrap_v: wrap,
            reflection_texture_matrix: None,
            bounding_box_size: None,
            bounding_box_position: Vec3::ZERO,
            throttle: RefreshThrottle::new(REFRESH_RATE_RENDER_ON_EVERY_FRAME),
            render_list: RenderListResolver::new(),
            frame_list: Vec::new(),
            dispatcher,
            post_process_chain: None,
            active_camera: None,
            clear_color: None,
            custom_render_function: None,
            use_camera_post_processes: None,
            ignore_camera_viewport: false,
            do_not_change_aspect_ratio: desc.do_not_change_aspect_ratio,
            render_particles: true,
            render_sprites: false,
            last_debug_dump: None,
            viewport_resized: Arc::new(AtomicBool::new(false)),
            resize_token: None,
            on_before_bind: Observable::new(),
            on_after_unbind: Observable::new(),
            on_before_render: Observable::new(),
            on_after_render: Observable::new(),
            on_clear: Observable::new(),
            after_unbind_token: None,
            before_render_token: None,
            after_render_token: None,
            clear_token: None,
        }
    }
}

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
