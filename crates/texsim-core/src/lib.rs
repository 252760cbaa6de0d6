//! Core types for the texsim harness.
//!
//! This crate provides the foundational types shared by the engine, the
//! similarity metric and the harness:
//! - RGBA8 pixel buffers read back from a canvas
//! - Two-dimensional extents
//! - Common error type

pub mod error;
pub mod pixels;

pub use error::{Error, Result};
pub use pixels::{Extent2D, PixelBuffer};

/// Harness-wide constants
pub mod constants {
    /// Channels per pixel in every buffer the harness handles (RGBA)
    pub const CHANNELS: usize = 4;
    /// Default settle delay between render loop start and readback, in milliseconds
    pub const DEFAULT_SETTLE_DELAY_MS: u64 = 200;
}
