/// Central render target manager for the engine.
///
/// Owns render targets in a slot map, indexed by unique name. Scenes and
/// cameras only hold `RenderTargetKey` handles; a removed target takes its
/// handles out of their registries as part of `dispose()`.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::camera::CameraKey;
use crate::error::Result;
use crate::{engine_bail, engine_err, engine_error};
use crate::scene::SharedScene;
use super::render_target::{lock_scene, RenderTarget, RenderTargetDesc};

new_key_type! {
    /// Stable key of a render target inside its `TargetManager`
    pub struct RenderTargetKey;
}

/// Target manager singleton (managed by Engine)
///
/// Multiple render targets can exist simultaneously (mirrors, reflection
/// probes, shadow maps, ...).
pub struct TargetManager {
    render_targets: SlotMap<RenderTargetKey, RenderTarget>,
    names: FxHashMap<String, RenderTargetKey>,
}

impl TargetManager {
    /// Create a new empty target manager
    pub fn new() -> Self {
        Self {
            render_targets: SlotMap::with_key(),
            names: FxHashMap::default(),
        }
    }

    /// Create a named render target drawing from `scene`
    ///
    /// # Errors
    ///
    /// Returns an error if a render target with the same name already
    /// exists, or if the backing surface cannot be allocated.
    pub fn create_render_target(&mut self, scene: &SharedScene, desc: RenderTargetDesc) -> Result<RenderTargetKey> {
        if self.names.contains_key(&desc.name) {
            engine_bail!("galaxy3d::TargetManager",
                "RenderTarget '{}' already exists", desc.name);
        }
        let target = RenderTarget::new(scene, desc)?;
        self.insert_render_target(target)
    }

    /// Take ownership of an existing render target (clone, deserialized, ...)
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken; the target is disposed.
    pub fn insert_render_target(&mut self, mut target: RenderTarget) -> Result<RenderTargetKey> {
        if self.names.contains_key(target.name()) {
            target.dispose();
            engine_bail!("galaxy3d::TargetManager",
                "RenderTarget '{}' already exists", target.name());
        }
        let name = target.name().to_string();
        let key = self.render_targets.insert(target);
        if let Some(target) = self.render_targets.get_mut(key) {
            target.set_key(Some(key));
        }
        self.names.insert(name, key);
        Ok(key)
    }

    pub fn render_target(&self, key: RenderTargetKey) -> Option<&RenderTarget> {
        self.render_targets.get(key)
    }

    pub fn render_target_mut(&mut self, key: RenderTargetKey) -> Option<&mut RenderTarget> {
        self.render_targets.get_mut(key)
    }

    /// Key of the render target named `name`
    pub fn key_of(&self, name: &str) -> Option<RenderTargetKey> {
        self.names.get(name).copied()
    }

    pub fn render_target_by_name(&self, name: &str) -> Option<&RenderTarget> {
        self.key_of(name).and_then(|key| self.render_targets.get(key))
    }

    pub fn render_target_by_name_mut(&mut self, name: &str) -> Option<&mut RenderTarget> {
        let key = self.key_of(name)?;
        self.render_targets.get_mut(key)
    }

    /// Render `key` before the scene's cameras
    pub fn attach_to_scene(&mut self, key: RenderTargetKey) -> Result<()> {
        let scene = self.owner_scene(key)?;
        lock_scene(&scene)?.add_custom_render_target(key);
        Ok(())
    }

    /// Render `key` before `camera`'s frame
    pub fn attach_to_camera(&mut self, key: RenderTargetKey, camera: CameraKey) -> Result<()> {
        let scene = self.owner_scene(key)?;
        let mut scene = lock_scene(&scene)?;
        let camera = scene.camera_mut(camera)
            .ok_or_else(|| engine_err!("galaxy3d::TargetManager", "Camera not found in scene"))?;
        camera.add_custom_render_target(key);
        Ok(())
    }

    /// Dispose and remove a render target
    ///
    /// Returns false if the key is unknown.
    pub fn remove_render_target(&mut self, key: RenderTargetKey) -> bool {
        let Some(mut target) = self.render_targets.remove(key) else {
            return false;
        };
        target.dispose();
        self.names.remove(target.name());
        true
    }

    /// Render every due target in `keys`, in order
    ///
    /// Targets whose throttle says no are skipped. Failures are logged and
    /// do not stop the other targets. Returns the number of targets rendered.
    pub fn render_targets(&mut self, keys: &[RenderTargetKey]) -> usize {
        let mut rendered = 0;
        for &key in keys {
            let Some(target) = self.render_targets.get_mut(key) else {
                continue;
            };
            if !target.should_render() {
                continue;
            }
            match target.render(false, false) {
                Ok(()) => rendered += 1,
                Err(err) => engine_error!("galaxy3d::TargetManager",
                    "RenderTarget '{}' failed to render: {}", target.name(), err),
            }
        }
        rendered
    }

    /// Render the targets registered on `scene`
    pub fn render_scene_targets(&mut self, scene: &SharedScene) -> Result<usize> {
        let keys = lock_scene(scene)?.custom_render_targets().to_vec();
        Ok(self.render_targets(&keys))
    }

    /// Render the targets registered on `camera`
    pub fn render_camera_targets(&mut self, scene: &SharedScene, camera: CameraKey) -> Result<usize> {
        let keys = lock_scene(scene)?
            .camera(camera)
            .map(|c| c.custom_render_targets().to_vec())
            .unwrap_or_default();
        Ok(self.render_targets(&keys))
    }

    /// Reallocate ratio-sized targets after a viewport resize
    ///
    /// Returns the number of targets reallocated.
    pub fn handle_viewport_resize(&mut self) -> usize {
        let mut resized = 0;
        for target in self.render_targets.values_mut() {
            match target.process_viewport_resize() {
                Ok(true) => resized += 1,
                Ok(false) => {}
                Err(err) => engine_error!("galaxy3d::TargetManager",
                    "RenderTarget '{}' failed to resize: {}", target.name(), err),
            }
        }
        resized
    }

    /// Recover every target from a device loss
    pub fn rebuild_all(&mut self) {
        for target in self.render_targets.values_mut() {
            if let Err(err) = target.rebuild() {
                engine_error!("galaxy3d::TargetManager",
                    "RenderTarget '{}' failed to rebuild: {}", target.name(), err);
            }
        }
    }

    /// Get the number of render targets
    pub fn render_target_count(&self) -> usize {
        self.render_targets.len()
    }

    /// Get all render target names
    pub fn render_target_names(&self) -> Vec<&str> {
        self.names.keys().map(|k| k.as_str()).collect()
    }

    /// Dispose and remove all render targets
    pub fn clear(&mut self) {
        for target in self.render_targets.values_mut() {
            target.dispose();
        }
        self.render_targets.clear();
        self.names.clear();
    }

    fn owner_scene(&self, key: RenderTargetKey) -> Result<SharedScene> {
        let target = self.render_targets.get(key)
            .ok_or_else(|| engine_err!("galaxy3d::TargetManager", "RenderTarget key not found"))?;
        target.scene()
            .ok_or_else(|| engine_err!("galaxy3d::TargetManager",
                "RenderTarget '{}' has no scene", target.name()))
    }
}

impl Default for TargetManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "target_manager_tests.rs"]
mod tests;
