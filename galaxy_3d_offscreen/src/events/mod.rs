//! Synchronous observer lists
//!
//! Render targets and the graphics device expose their notifications
//! (before-bind, after-unbind, before/after-render per face, clear, viewport
//! resize) as explicit ordered listener lists. Registration hands back an
//! opaque token used to remove the listener later.

mod observable;

pub use observable::{Observable, ObserverToken};
