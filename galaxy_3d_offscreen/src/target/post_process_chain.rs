/// Post-process chain owned by a render target.
///
/// The chain is created on the first added stage and lives until the
/// target is disposed. The first stage never auto-clears: the target's own
/// clear already ran.

use std::sync::Arc;
use crate::graphics_device::Surface;
use crate::scene::{PostProcess, PostProcessManager};

pub struct PostProcessChain {
    manager: Box<dyn PostProcessManager>,
    stages: Vec<Arc<dyn PostProcess>>,
}

impl PostProcessChain {
    pub fn new(manager: Box<dyn PostProcessManager>) -> Self {
        Self {
            manager,
            stages: Vec::new(),
        }
    }

    pub fn stages(&self) -> &[Arc<dyn PostProcess>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Insert `stage` at `index` (appended when None or past the end)
    pub fn add(&mut self, stage: Arc<dyn PostProcess>, index: Option<usize>) {
        match index {
            Some(index) if index < self.stages.len() => self.stages.insert(index, stage),
            _ => self.stages.push(stage),
        }
        self.fix_first_stage();
    }

    /// Remove `stage` (matched by identity). Returns false if it was not in the chain.
    pub fn remove(&mut self, stage: &Arc<dyn PostProcess>) -> bool {
        let Some(index) = self.stages.iter().position(|s| Arc::ptr_eq(s, stage)) else {
            return false;
        };
        self.stages.remove(index);
        self.fix_first_stage();
        true
    }

    /// Remove every stage, disposing them when `dispose` is set
    pub fn clear(&mut self, dispose: bool) {
        if dispose {
            for stage in &self.stages {
                stage.dispose();
            }
        }
        self.stages.clear();
    }

    pub fn prepare_frame(&mut self, surface: &Arc<dyn Surface>) -> bool {
        self.manager.prepare_frame(surface, Some(&self.stages))
    }

    pub fn finalize_frame(&mut self, surface: &Arc<dyn Surface>, face_index: u32, ignore_viewport: bool) {
        self.manager.finalize_frame(false, surface, face_index, Some(&self.stages), ignore_viewport);
    }

    /// Recreate the manager's and every stage's GPU resources
    pub fn rebuild(&mut self) {
        self.manager.rebuild();
        for stage in &self.stages {
            stage.rebuild();
        }
    }

    /// Dispose every stage and the manager
    pub fn dispose(&mut self) {
        self.clear(true);
        self.manager.dispose();
    }

    fn fix_first_stage(&self) {
        if let Some(first) = self.stages.first() {
            first.set_auto_clear(false);
        }
    }
}

#[cfg(test)]
#[path = "post_process_chain_tests.rs"]
mod tests;
