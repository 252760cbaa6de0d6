//! Texture resources.

use std::sync::Arc;

use crate::error::{EngineError, Result};

/// Source layout of a loaded texture.
///
/// Every texture is stored as RGBA8 for sampling; the format records what
/// the asset contained so it can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8G8B8A8,
    R8G8B8,
    LuminanceAlpha,
    Luminance,
}

impl TextureFormat {
    /// Name used in load reports.
    pub const fn name(self) -> &'static str {
        match self {
            Self::R8G8B8A8 => "R8G8B8A8",
            Self::R8G8B8 => "R8G8B8",
            Self::LuminanceAlpha => "LuminanceAlpha",
            Self::Luminance => "Luminance",
        }
    }
}

impl std::fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Formats a Basis Universal KTX2 payload can be transcoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ktx2TargetFormat {
    Astc,
    Bc7,
    Bc1Bc3,
    Pvrtc,
    Etc,
    R8,
    R8G8,
    R8G8B8A8,
}

impl Ktx2TargetFormat {
    /// Whether the software renderer can sample textures in this format.
    pub const fn is_sampleable(self) -> bool {
        matches!(self, Self::R8G8B8A8)
    }

    /// Pick the first sampleable format from a priority list.
    ///
    /// Falls back to [`Ktx2TargetFormat::R8G8B8A8`] when none qualifies.
    pub fn select(priority: &[Self]) -> Self {
        priority
            .iter()
            .copied()
            .find(|format| format.is_sampleable())
            .unwrap_or(Self::R8G8B8A8)
    }
}

/// A decoded 2D texture.
#[derive(Clone)]
pub struct Texture2D {
    width: u32,
    height: u32,
    format: TextureFormat,
    pixels: Arc<[u8]>,
}

impl Texture2D {
    /// Wrap RGBA8 texels, checking their length.
    pub fn from_rgba8(width: u32, height: u32, format: TextureFormat, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(EngineError::InvalidData(format!(
                "expected {expected} bytes of RGBA8 data for {width}x{height}, got {}",
                pixels.len()
            )));
        }
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidData(format!(
                "texture has zero size ({width}x{height})"
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            pixels: pixels.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// RGBA8 texels, rows top-down.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Texel at `(x, y)`; coordinates must be in range.
    #[inline]
    pub(crate) fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let texels: &[[u8; 4]] = bytemuck::cast_slice(&self.pixels[..]);
        texels[y as usize * self.width as usize + x as usize]
    }
}

impl std::fmt::Debug for Texture2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture2D")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_format_selection() {
        assert_eq!(Ktx2TargetFormat::select(&[]), Ktx2TargetFormat::R8G8B8A8);
        assert_eq!(
            Ktx2TargetFormat::select(&[Ktx2TargetFormat::Pvrtc, Ktx2TargetFormat::Astc]),
            Ktx2TargetFormat::R8G8B8A8
        );
        assert_eq!(
            Ktx2TargetFormat::select(&[Ktx2TargetFormat::Etc, Ktx2TargetFormat::R8G8B8A8]),
            Ktx2TargetFormat::R8G8B8A8
        );
    }

    #[test]
    fn texture_checks_data_length() {
        assert!(Texture2D::from_rgba8(2, 2, TextureFormat::R8G8B8A8, vec![0; 16]).is_ok());
        assert!(Texture2D::from_rgba8(2, 2, TextureFormat::R8G8B8A8, vec![0; 12]).is_err());
        assert!(Texture2D::from_rgba8(0, 2, TextureFormat::R8G8B8A8, vec![]).is_err());
    }

    #[test]
    fn texel_lookup() {
        let mut data = vec![0; 2 * 2 * 4];
        data[12..16].copy_from_slice(&[9, 8, 7, 6]);
        let texture = Texture2D::from_rgba8(2, 2, TextureFormat::R8G8B8, data).unwrap();
        assert_eq!(texture.texel(1, 1), [9, 8, 7, 6]);
        assert_eq!(texture.format().to_string(), "R8G8B8");
    }
}
