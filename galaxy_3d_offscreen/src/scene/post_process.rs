/// Post-process seams: a single stage and the chain executor.

use std::sync::Arc;
use crate::graphics_device::Surface;

/// One post-process stage
///
/// Stages are shared (`Arc`) between the chain that owns them and the
/// caller that created them, so their mutable state sits behind `&self`.
pub trait PostProcess: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the stage clears its input before drawing
    fn auto_clear(&self) -> bool;

    fn set_auto_clear(&self, auto_clear: bool);

    /// Recreate GPU resources after a device loss
    fn rebuild(&self);

    /// Release GPU resources. The stage is unusable afterwards.
    fn dispose(&self);
}

/// Post-process chain executor
pub trait PostProcessManager: Send {
    /// Prepare `surface` as the input of the chain
    ///
    /// With `stages` None the manager's own (camera) stages are used.
    /// Returns false when there is nothing to run, in which case the caller
    /// binds the surface itself.
    fn prepare_frame(&mut self, surface: &Arc<dyn Surface>, stages: Option<&[Arc<dyn PostProcess>]>) -> bool;

    /// Run the chain, writing the result back to `surface` (face `face_index`)
    fn finalize_frame(
        &mut self,
        disable_engine_alpha: bool,
        surface: &Arc<dyn Surface>,
        face_index: u32,
        stages: Option<&[Arc<dyn PostProcess>]>,
        ignore_viewport: bool,
    );

    /// Recreate GPU resources after a device loss
    fn rebuild(&mut self);

    fn dispose(&mut self);

    /// Fresh manager of the same kind, with no camera stages
    fn new_instance(&self) -> Box<dyn PostProcessManager>;
}
