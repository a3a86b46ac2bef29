/// Save/load of render targets.
///
/// Only configuration is saved; the render list is stored as entity ids
/// and resolved lazily against the scene on the first render after load.

use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::engine_debug;
use crate::graphics_device::Extent2D;
use crate::scene::SharedScene;
use super::super::refresh_throttle::REFRESH_RATE_RENDER_ON_EVERY_FRAME;
use super::super::size_resolver::SizeSpec;
use super::{lock_scene, CoordinatesMode, RenderTarget, RenderTargetDesc};

fn default_refresh_rate() -> u32 {
    REFRESH_RATE_RENDER_ON_EVERY_FRAME
}

/// Saved form of a render target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedRenderTarget {
    pub name: String,
    pub level: f32,
    pub has_alpha: bool,
    pub coordinates_mode: CoordinatesMode,
    pub is_cube: bool,
    pub is_render_target: bool,
    pub render_target_size: Extent2D,
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u32,
    /// Ids of the render list entities, in list order
    #[serde(default)]
    pub render_list: Vec<String>,
}

impl RenderTarget {
    /// Saved form of this target
    ///
    /// Returns None for unnamed targets, and when the scene is gone.
    pub fn serialize(&self) -> Result<Option<SerializedRenderTarget>> {
        if self.name.is_empty() {
            return Ok(None);
        }
        let render_list = match self.render_list.pending_ids() {
            Some(ids) => ids.to_vec(),
            None => {
                let Some(scene) = self.scene.upgrade() else {
                    engine_debug!("galaxy3d::RenderTarget", "'{}': scene gone, not serialized", self.name);
                    return Ok(None);
                };
                let scene = lock_scene(&scene)?;
                self.render_list()
                    .unwrap_or(&[])
                    .iter()
                    .filter_map(|key| scene.entity(*key).map(|d| d.id().to_string()))
                    .collect()
            }
        };

        Ok(Some(SerializedRenderTarget {
            name: self.name.clone(),
            level: self.level,
            has_alpha: self.has_alpha,
            coordinates_mode: self.coordinates_mode,
            is_cube: self.is_cube,
            is_render_target: true,
            render_target_size: self.size,
            refresh_rate: self.throttle.refresh_rate(),
            render_list,
        }))
    }

    /// Recreate a target from its saved form
    ///
    /// The render list ids are kept pending until the first render.
    pub fn from_serialized(scene: &SharedScene, data: &SerializedRenderTarget) -> Result<RenderTarget> {
        let desc = RenderTargetDesc {
            name: data.name.clone(),
            size: SizeSpec::from(data.render_target_size),
            is_cube: data.is_cube,
            ..RenderTargetDesc::default()
        };
        let mut target = RenderTarget::new(scene, desc)?;
        target.level = data.level;
        target.has_alpha = data.has_alpha;
        target.coordinates_mode = data.coordinates_mode;
        target.set_refresh_rate(data.refresh_rate);
        target.set_pending_render_list_ids(data.render_list.clone());
        Ok(target)
    }

    /// Saved form as pretty JSON (None where `serialize` returns None)
    pub fn to_json(&self) -> Result<Option<String>> {
        match self.serialize()? {
            Some(data) => Ok(Some(serde_json::to_string_pretty(&data)?)),
            None => Ok(None),
        }
    }

    /// Recreate a target from JSON produced by `to_json`
    pub fn from_json(scene: &SharedScene, json: &str) -> Result<RenderTarget> {
        let data: SerializedRenderTarget = serde_json::from_str(json)?;
        Self::from_serialized(scene, &data)
    }
}

#[cfg(test)]
#[path = "serialization_tests.rs"]
mod tests;
