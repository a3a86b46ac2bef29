//! Error types for the Galaxy3D offscreen rendering layer
//!
//! This module defines the error type shared by render targets, the target
//! manager and the collaborator traits (graphics device, post-process chain,
//! rendering groups), together with the `engine_bail!` / `engine_err!` helpers
//! that log an error before handing it back to the caller.

use std::fmt;

/// Result type for Galaxy3D offscreen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D offscreen errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (device, collaborator, poisoned lock, ...)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (surface, camera, entity key, ...)
    InvalidResource(String),

    /// Initialization failed (engine, device, subsystems)
    InitializationFailed(String),

    /// The device could not allocate a color or depth/stencil surface
    AllocationFailed(String),

    /// A serialized render target could not be encoded or decoded
    SerializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AllocationFailed(msg) => write!(f, "Allocation failed: {}", msg),
            Error::SerializationFailed(msg) => write!(f, "Serialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationFailed(err.to_string())
    }
}

/// Map a poisoned lock into a backend error naming the guarded object.
pub(crate) fn poisoned(what: &str) -> Error {
    Error::BackendError(format!("{} lock poisoned", what))
}

// ===== ERROR MACROS =====

/// Log an ERROR and return `Err(Error::BackendError(..))` from the current function
///
/// # Example
///
/// ```ignore
/// engine_bail!("galaxy3d::TargetManager", "RenderTarget '{}' already exists", name);
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        return Err($crate::galaxy3d::Error::BackendError(message));
    }};
}

/// Log an ERROR and evaluate to an `Error::BackendError(..)` value
///
/// Intended for `ok_or_else` / `map_err` chains.
///
/// # Example
///
/// ```ignore
/// let camera = scene.camera(key)
///     .ok_or_else(|| engine_err!("galaxy3d::RenderTarget", "Camera not found"))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::BackendError(message)
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
