//! Render target module
//!
//! Offscreen render targets and their manager: size resolution, refresh
//! throttling, render list resolution, the face pass sequence, surface
//! lifecycle, owned post-process chains and save/load.

mod post_process_chain;
mod refresh_throttle;
mod render_list;
mod render_target;
mod size_resolver;
mod target_manager;

#[cfg(test)]
pub(crate) mod test_fixture;

pub use post_process_chain::PostProcessChain;
pub use refresh_throttle::{
    RefreshThrottle,
    REFRESH_RATE_RENDER_ONCE, REFRESH_RATE_RENDER_ON_EVERY_FRAME,
    REFRESH_RATE_RENDER_ON_EVERY_TWO_FRAMES,
};
pub use render_list::{RenderListResolver, RenderListPredicate, FrameListSource};
pub use render_target::{
    RenderTarget, RenderTargetDesc, CoordinatesMode, WrapMode,
    FramebufferDump, SerializedRenderTarget,
};
pub use size_resolver::{SizeSpec, best_reflection_dimension, floor_pot, nearest_pot};
pub use target_manager::{TargetManager, RenderTargetKey};
