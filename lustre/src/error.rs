//! Error types for the renderer.

use glam::UVec2;
use thiserror::Error;

use crate::{BufferHandle, CameraHandle, TextureFormat, TextureHandle};

/// Main error type for rendering operations.
///
/// Failed frames don't commit anything into the history, so every error here
/// is recoverable by simply rendering the next frame.
#[derive(Error, Debug)]
pub enum Error {
    /// Backend couldn't allocate a texture or a buffer
    #[error("Couldn't allocate `{label}`: {reason}")]
    Allocation { label: String, reason: String },

    /// Camera is not known to the engine
    #[error("Camera does not exist: {0:?}")]
    UnknownCamera(CameraHandle),

    /// Camera cannot be rendered because it doesn't have a lens
    #[error("Camera has no lens: {0:?}")]
    MissingLens(CameraHandle),

    /// Camera cannot be rendered because its viewport is empty
    #[error("Camera has an empty viewport: {0:?}")]
    EmptyViewport(CameraHandle),

    /// Settings contain an out-of-range value
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Command refers to a texture that's been released (or never existed)
    #[error("Texture does not exist: {0:?}")]
    UnknownTexture(TextureHandle),

    /// Command refers to a buffer that's been released (or never existed)
    #[error("Buffer does not exist: {0:?}")]
    UnknownBuffer(BufferHandle),

    /// Command mixes textures of different sizes
    #[error("Size mismatch: expected {expected}, got {actual} for {texture:?}")]
    SizeMismatch {
        texture: TextureHandle,
        expected: UVec2,
        actual: UVec2,
    },

    /// Command binds a texture of unexpected format
    #[error(
        "Format mismatch: expected {expected:?}, got {actual:?} for {texture:?}"
    )]
    FormatMismatch {
        texture: TextureHandle,
        expected: TextureFormat,
        actual: TextureFormat,
    },

    /// Command would read and write the same texture
    #[error("Texture is both read and written by a single command: {0:?}")]
    Aliasing(TextureHandle),

    /// Presentation was requested, but there's nowhere to present to
    #[error("No output target has been configured")]
    NoOutputTarget,

    /// Device-level failure, e.g. a lost device or a failing dispatch
    #[error("Device error: {0}")]
    Device(String),

    /// Presented image couldn't be exported
    #[error("Export failed: {0}")]
    Export(#[from] image::ImageError),
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, Error>;
