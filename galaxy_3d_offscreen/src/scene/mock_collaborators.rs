/// Mock scene collaborators for tests and headless tools
///
/// Every mock records into the same `CommandLog` as `MockGraphicsDevice`
/// so the full interleaving of a render pass can be asserted.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use crate::graphics_device::Surface;
use crate::graphics_device::mock_graphics_device::CommandLog;
use super::drawable::{EntityKey, SubMeshRef};
use super::particle_system::ParticleSystem;
use super::post_process::{PostProcess, PostProcessManager};
use super::rendering_group::{
    CustomRenderFn, RenderQueues, RenderingGroupDispatcher, SubMeshComparator,
};

// ============================================================================
// Mock RenderingGroupDispatcher
// ============================================================================

/// What a mock dispatcher (and every instance created from it) received
#[derive(Debug, Default, Clone)]
pub struct DispatchRecord {
    /// Sub-meshes queued since the last reset
    pub queued: Vec<SubMeshRef>,
    /// Every sub-mesh ever dispatched
    pub dispatched: Vec<SubMeshRef>,
    /// Names of particle systems queued since the last reset
    pub particles: Vec<String>,
    /// Number of `render` calls
    pub render_calls: usize,
    /// Groups whose order was overridden
    pub ordered_groups: Vec<u32>,
    /// (group, auto_clear, depth, stencil)
    pub auto_clear_settings: Vec<(u32, bool, bool, bool)>,
}

pub struct MockRenderingDispatcher {
    log: CommandLog,
    record: Arc<Mutex<DispatchRecord>>,
}

impl MockRenderingDispatcher {
    pub fn new(log: CommandLog) -> Self {
        Self {
            log,
            record: Arc::new(Mutex::new(DispatchRecord::default())),
        }
    }

    /// Record shared by this dispatcher and all its instances
    pub fn record(&self) -> Arc<Mutex<DispatchRecord>> {
        self.record.clone()
    }

    fn with_record(&self, f: impl FnOnce(&mut DispatchRecord)) {
        if let Ok(mut record) = self.record.lock() {
            f(&mut record);
        }
    }
}

impl RenderingGroupDispatcher for MockRenderingDispatcher {
    fn reset(&mut self) {
        self.log.push("dispatcher.reset");
        self.with_record(|r| {
            r.queued.clear();
            r.particles.clear();
        });
    }

    fn dispatch(&mut self, sub_mesh: SubMeshRef) {
        self.log.push(format!("dispatcher.dispatch {}", sub_mesh.index));
        self.with_record(|r| {
            r.queued.push(sub_mesh);
            r.dispatched.push(sub_mesh);
        });
    }

    fn dispatch_particles(&mut self, system: &ParticleSystem) {
        self.log.push(format!("dispatcher.particles {}", system.name()));
        self.with_record(|r| r.particles.push(system.name().to_string()));
    }

    fn render(
        &mut self,
        custom_render: Option<&CustomRenderFn>,
        render_list: &[EntityKey],
        render_particles: bool,
        render_sprites: bool,
    ) {
        self.log.push(format!(
            "dispatcher.render list={} particles={} sprites={} custom={}",
            render_list.len(), render_particles, render_sprites, custom_render.is_some()
        ));
        let queued = self.record.lock().map(|r| r.queued.clone()).unwrap_or_default();
        self.with_record(|r| r.render_calls += 1);
        if let Some(custom_render) = custom_render {
            custom_render(&RenderQueues {
                opaque: &queued,
                alpha_test: &[],
                transparent: &[],
                depth_only: &[],
            });
        }
    }

    fn set_rendering_order(
        &mut self,
        group: u32,
        _opaque: Option<SubMeshComparator>,
        _alpha_test: Option<SubMeshComparator>,
        _transparent: Option<SubMeshComparator>,
    ) {
        self.log.push(format!("dispatcher.order {}", group));
        self.with_record(|r| r.ordered_groups.push(group));
    }

    fn set_auto_clear_depth_stencil(&mut self, group: u32, auto_clear: bool, depth: bool, stencil: bool) {
        self.log.push(format!("dispatcher.auto_clear {}", group));
        self.with_record(|r| r.auto_clear_settings.push((group, auto_clear, depth, stencil)));
    }

    fn free_groups(&mut self) {
        self.log.push("dispatcher.free_groups");
    }

    fn new_instance(&self) -> Box<dyn RenderingGroupDispatcher> {
        Box::new(Self {
            log: self.log.clone(),
            record: self.record.clone(),
        })
    }
}

// ============================================================================
// Mock PostProcess
// ============================================================================

pub struct MockPostProcess {
    name: String,
    auto_clear: AtomicBool,
    disposed: AtomicBool,
    rebuilds: AtomicUsize,
    log: CommandLog,
}

impl MockPostProcess {
    pub fn new(name: impl Into<String>, log: CommandLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            auto_clear: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
            rebuilds: AtomicUsize::new(0),
            log,
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn rebuild_count(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }
}

impl PostProcess for MockPostProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn auto_clear(&self) -> bool {
        self.auto_clear.load(Ordering::SeqCst)
    }

    fn set_auto_clear(&self, auto_clear: bool) {
        self.auto_clear.store(auto_clear, Ordering::SeqCst);
    }

    fn rebuild(&self) {
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("stage.rebuild {}", self.name));
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.log.push(format!("stage.dispose {}", self.name));
    }
}

// ============================================================================
// Mock PostProcessManager
// ============================================================================

pub struct MockPostProcessManager {
    label: String,
    log: CommandLog,
    has_camera_stages: Arc<AtomicBool>,
}

impl MockPostProcessManager {
    /// Scene-level manager. Camera stages are off until `set_has_camera_stages`.
    pub fn new(log: CommandLog) -> Self {
        Self {
            label: "scene".to_string(),
            log,
            has_camera_stages: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag shared with the scene-level manager, toggling camera stages
    pub fn camera_stages_flag(&self) -> Arc<AtomicBool> {
        self.has_camera_stages.clone()
    }

    pub fn set_has_camera_stages(&self, value: bool) {
        self.has_camera_stages.store(value, Ordering::SeqCst);
    }

    fn stage_names(stages: Option<&[Arc<dyn PostProcess>]>) -> String {
        match stages {
            Some(stages) => stages.iter().map(|s| s.name()).collect::<Vec<_>>().join(","),
            None => "camera".to_string(),
        }
    }
}

impl PostProcessManager for MockPostProcessManager {
    fn prepare_frame(&mut self, surface: &Arc<dyn Surface>, stages: Option<&[Arc<dyn PostProcess>]>) -> bool {
        let prepared = match stages {
            Some(stages) => !stages.is_empty(),
            None => self.has_camera_stages.load(Ordering::SeqCst),
        };
        self.log.push(format!(
            "post.prepare {} {} [{}] {}",
            self.label, surface.id(), Self::stage_names(stages), prepared
        ));
        prepared
    }

    fn finalize_frame(
        &mut self,
        disable_engine_alpha: bool,
        surface: &Arc<dyn Surface>,
        face_index: u32,
        stages: Option<&[Arc<dyn PostProcess>]>,
        ignore_viewport: bool,
    ) {
        self.log.push(format!(
            "post.finalize {} {} face={} [{}] alpha_off={} ignore_viewport={}",
            self.label, surface.id(), face_index, Self::stage_names(stages),
            disable_engine_alpha, ignore_viewport
        ));
    }

    fn rebuild(&mut self) {
        self.log.push(format!("post.rebuild {}", self.label));
    }

    fn dispose(&mut self) {
        self.log.push(format!("post.dispose {}", self.label));
    }

    fn new_instance(&self) -> Box<dyn PostProcessManager> {
        Box::new(Self {
            label: "target".to_string(),
            log: self.log.clone(),
            has_camera_stages: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[cfg(test)]
#[path = "mock_collaborators_tests.rs"]
mod tests;
