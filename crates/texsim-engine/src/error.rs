//! Engine error types.

use thiserror::Error;

/// Rendering engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The canvas cannot provide a 3D rendering context.
    #[error("No 3D context available for canvas '{0}'")]
    ContextUnavailable(String),

    /// Another live engine is already bound to the canvas.
    #[error("Canvas '{0}' is already bound to an engine")]
    CanvasInUse(String),

    /// Asset could not be found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// URL scheme the asset sources cannot serve.
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error.
    #[error("Image decoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// Container or payload decoding error.
    #[error("Decoding failed: {0}")]
    Decode(String),

    /// Texture format the engine cannot display.
    #[error("Unsupported texture format: {0}")]
    UnsupportedFormat(String),

    /// Malformed texture data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Entity handle that does not belong to the scene.
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    /// Pixel region outside the canvas.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// Pixel buffer construction failed.
    #[error(transparent)]
    Buffer(#[from] texsim_core::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, EngineError>;
