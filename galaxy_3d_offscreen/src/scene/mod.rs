//! Scene module
//!
//! The scene render targets draw from: drawables, cameras, particle systems,
//! frame bookkeeping, and the rendering-group dispatcher and post-process
//! seams, with mock implementations of both.

mod drawable;
mod particle_system;
mod post_process;
mod rendering_group;
mod scene;

// Mock collaborators for tests and headless tools
pub mod mock_collaborators;

pub use drawable::{
    Drawable, EntityKey, SubMesh, SubMeshRef,
    FLAG_ENABLED, FLAG_VISIBLE, FLAG_READY,
};
pub use particle_system::ParticleSystem;
pub use post_process::{PostProcess, PostProcessManager};
pub use rendering_group::{
    RenderingGroupDispatcher, RenderQueues, CustomRenderFn, SubMeshComparator,
};
pub use scene::{Scene, SharedScene, MaterialDirtyFlags};
