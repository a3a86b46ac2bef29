/*!
# Galaxy 3D Offscreen

Offscreen render targets for the Galaxy 3D engine.

A render target owns a flat or cube surface on a `GraphicsDevice` and
renders a scene into it: mirrors, reflection probes, shadow maps, minimaps.
The device, the rendering-group dispatcher and post-processing are reached
through traits, so backends plug in behind them and tests run headless
against the mock implementations.

## Architecture

- **GraphicsDevice**: surface allocation, framebuffer bind/unbind, clear
- **Scene**: drawables, cameras, particle systems, frame bookkeeping
- **RenderTarget**: one offscreen surface and its face pass sequence
- **TargetManager**: owns every render target, renders them per frame
- **Observable**: ordered listener lists for target and device events
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod events;
pub mod graphics_device;
pub mod camera;
pub mod scene;
pub mod target;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Target manager and render targets
    pub use crate::target::{RenderTarget, RenderTargetDesc, RenderTargetKey, TargetManager};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, MemoryLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Render target sub-module
    pub mod target {
        pub use crate::target::*;
    }

    // Graphics device sub-module
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Events sub-module
    pub mod events {
        pub use crate::events::*;
    }
}

// Re-export math library at crate root
pub use glam;
