//! Error types for core data handling.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Buffer length does not match the declared dimensions
    #[error("Invalid buffer: expected {expected} bytes for {width}x{height}, got {actual}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
