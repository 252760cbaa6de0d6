//! Similarity error types.

use texsim_core::Extent2D;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SsimError {
    /// The two buffers have different dimensions.
    #[error("Image dimensions don't match: {left} vs {right}")]
    DimensionMismatch { left: Extent2D, right: Extent2D },

    /// The image (after downsampling) is smaller than the window.
    #[error("Image of {extent} is too small for a {window}x{window} window")]
    ImageTooSmall { extent: Extent2D, window: u32 },

    #[error("Invalid SSIM options: {0}")]
    InvalidOptions(String),
}

pub type Result<T> = std::result::Result<T, SsimError>;
