//! RGBA8 pixel buffers.

use crate::constants::CHANNELS;
use crate::error::{Error, Result};

/// Width and height of a surface or image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered by this extent.
    #[inline]
    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size in bytes of an RGBA8 buffer with this extent.
    #[inline]
    pub const fn rgba_len(&self) -> usize {
        self.area() * CHANNELS
    }

    /// Returns true if either dimension is zero.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Extent2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Flat RGBA8 pixel data, rows top-down.
///
/// The length is always `4 * width * height`. A buffer is produced once per
/// readback and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    extent: Extent2D,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA8 data, checking its length against the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let extent = Extent2D::new(width, height);
        let expected = extent.rgba_len();
        if data.len() != expected {
            return Err(Error::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { extent, data })
    }

    /// Allocate a zeroed (transparent black) buffer.
    pub fn zeroed(width: u32, height: u32) -> Self {
        let extent = Extent2D::new(width, height);
        Self {
            extent,
            data: vec![0; extent.rgba_len()],
        }
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        self.extent.width
    }

    #[inline]
    pub const fn height(&self) -> u32 {
        self.extent.height
    }

    #[inline]
    pub const fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Raw channel bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// View the data as whole pixels.
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.data[..])
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.extent.width || y >= self.extent.height {
            return None;
        }
        let index = y as usize * self.extent.width as usize + x as usize;
        self.pixels().get(index).copied()
    }

    /// Returns true if every channel of every pixel is zero.
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    /// Consume the buffer, returning the raw bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("extent", &self.extent)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .finish()
    }
}
