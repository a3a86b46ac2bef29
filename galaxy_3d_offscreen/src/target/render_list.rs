/// Render list resolution - which entities a render target draws this frame.
///
/// Precedence, evaluated once per `render()`:
/// 1. a deferred id list (from a saved scene) is resolved once, then dropped
/// 2. else a predicate rebuilds the list from every scene entity
/// 3. else the explicit list set by the caller is kept as is
///
/// With no list at all the frame uses the scene's active entity set, and
/// only then does the camera layer mask apply.

use std::fmt;
use std::sync::Arc;
use crate::engine_trace;
use crate::scene::{Drawable, EntityKey, Scene};

/// Keeps the entities a predicate-driven render list should draw
pub type RenderListPredicate = Arc<dyn Fn(&Drawable) -> bool + Send + Sync>;

/// Where the frame list of a render came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameListSource {
    /// Explicit, predicate-built or id-resolved render list
    RenderList,
    /// The scene's active entity set (camera layer mask applies)
    ActiveEntities,
}

#[derive(Default)]
pub struct RenderListResolver {
    render_list: Option<Vec<EntityKey>>,
    predicate: Option<RenderListPredicate>,
    pending_ids: Option<Vec<String>>,
}

impl RenderListResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current render list, None when the active entity set is used
    pub fn render_list(&self) -> Option<&[EntityKey]> {
        self.render_list.as_deref()
    }

    pub fn set_render_list(&mut self, list: Option<Vec<EntityKey>>) {
        self.render_list = list;
    }

    pub fn predicate(&self) -> Option<&RenderListPredicate> {
        self.predicate.as_ref()
    }

    /// Rebuild the render list from the predicate on every render
    pub fn set_predicate(&mut self, predicate: Option<RenderListPredicate>) {
        self.predicate = predicate;
    }

    /// Ids waiting to be resolved on the next render
    pub fn pending_ids(&self) -> Option<&[String]> {
        self.pending_ids.as_deref()
    }

    /// Defer a render list given by entity ids until the next render
    pub fn set_pending_ids(&mut self, ids: Vec<String>) {
        self.pending_ids = Some(ids);
    }

    /// Drop the list, the predicate and any pending ids
    pub fn clear(&mut self) {
        self.render_list = None;
        self.predicate = None;
        self.pending_ids = None;
    }

    /// Apply the precedence rules against `scene`
    pub fn resolve(&mut self, scene: &Scene) {
        if let Some(ids) = self.pending_ids.take() {
            let mut list = Vec::with_capacity(ids.len());
            for id in &ids {
                match scene.entity_by_id(id) {
                    Some(key) => list.push(key),
                    None => engine_trace!("galaxy3d::RenderTarget",
                        "Render list id '{}' matches no entity, dropped", id),
                }
            }
            self.render_list = Some(list);
        } else if let Some(predicate) = &self.predicate {
            let list = self.render_list.get_or_insert_with(Vec::new);
            list.clear();
            list.extend(scene.entity_keys().iter().copied().filter(|key| {
                scene.entity(*key).map_or(false, |drawable| predicate(drawable))
            }));
        }
    }

    /// Fill `out` with the entities of this frame
    ///
    /// `out` is a scratch buffer reused across frames.
    pub fn fill_frame_list(&self, scene: &Scene, out: &mut Vec<EntityKey>) -> FrameListSource {
        out.clear();
        match &self.render_list {
            Some(list) => {
                out.extend_from_slice(list);
                FrameListSource::RenderList
            }
            None => {
                out.extend_from_slice(scene.active_entities());
                FrameListSource::ActiveEntities
            }
        }
    }
}

impl fmt::Debug for RenderListResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderListResolver")
            .field("render_list", &self.render_list)
            .field("has_predicate", &self.predicate.is_some())
            .field("pending_ids", &self.pending_ids)
            .finish()
    }
}

#[cfg(test)]
#[path = "render_list_tests.rs"]
mod tests;
