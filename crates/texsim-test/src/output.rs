//! Saving read-back frames and SSIM maps as images.

use std::path::{Path, PathBuf};

use image::{GrayImage, RgbaImage};
use texsim_core::PixelBuffer;
use texsim_ssim::Plane;
use tracing::info;

use crate::{HarnessError, Result};

/// Save an RGBA8 buffer. The format follows the file extension.
pub fn save_frame(pixels: &PixelBuffer, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let image = RgbaImage::from_raw(pixels.width(), pixels.height(), pixels.as_bytes().to_vec())
        .ok_or_else(|| HarnessError::Output(format!("invalid frame for {}", path.display())))?;
    image.save(path)?;
    info!("Frame saved: {}", path.display());
    Ok(())
}

/// Save an SSIM map as grayscale, mapping [0, 1] to black..white.
/// Negative values are clamped to black.
pub fn save_ssim_map(map: &Plane, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let data = map
        .data
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let image = GrayImage::from_raw(map.width, map.height, data)
        .ok_or_else(|| HarnessError::Output(format!("invalid SSIM map for {}", path.display())))?;
    image.save(path)?;
    info!("SSIM map saved: {}", path.display());
    Ok(())
}

/// File name for a frame read back from `url`: its last path segment with a
/// `.png` extension, prefixed by `prefix`.
pub fn frame_file_name(prefix: &str, url: &str) -> PathBuf {
    let stem = url
        .rsplit('/')
        .next()
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("frame");
    PathBuf::from(format!("{prefix}-{stem}.png"))
}
