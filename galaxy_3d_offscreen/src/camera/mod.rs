//! Camera module - passive camera data owned by the scene.
//!
//! A camera carries its view/projection matrices, a normalized viewport, a
//! layer mask and the list of render targets attached to it.

mod camera;

pub use camera::{Camera, CameraKey, LAYER_MASK_ALL};
