//! Structural similarity between two RGBA8 pixel buffers.
//!
//! Both images are reduced to luma, box-downsampled when large, and compared
//! with one of two SSIM variants:
//! - [`SsimVariant::Original`]: Gaussian-weighted sliding window (σ = 1.5)
//! - [`SsimVariant::Bezkrovny`]: non-overlapping blocks, unweighted statistics
//!
//! The result's `mssim` is the mean of the SSIM map. Comparing a buffer with
//! itself gives exactly `1.0`.

mod bezkrovny;
pub mod error;
pub mod filter;
pub mod gray;
pub mod options;
mod original;

use std::time::{Duration, Instant};

use texsim_core::{Extent2D, PixelBuffer};
use tracing::debug;

pub use error::{Result, SsimError};
pub use gray::Plane;
pub use options::{SsimOptions, SsimVariant};

/// Outcome of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct SsimResult {
    /// Mean SSIM over the map.
    pub mssim: f64,
    /// Per-window SSIM values, row-major.
    pub ssim_map: Plane,
    /// Time spent computing.
    pub elapsed: Duration,
}

impl SsimResult {
    /// `mssim` as a percentage.
    pub fn percentage(&self) -> f64 {
        self.mssim * 100.0
    }

    pub fn map_extent(&self) -> Extent2D {
        self.ssim_map.extent()
    }
}

/// Compare two buffers of equal dimensions.
pub fn compute_similarity(a: &PixelBuffer, b: &PixelBuffer, options: &SsimOptions) -> Result<SsimResult> {
    options.validate()?;
    if a.extent() != b.extent() {
        return Err(SsimError::DimensionMismatch {
            left: a.extent(),
            right: b.extent(),
        });
    }
    let start = Instant::now();

    let (mut gray_a, mut gray_b) = rayon::join(|| gray::to_gray(a), || gray::to_gray(b));
    if let Some(max_size) = options.max_size {
        let factor = gray::downsample_factor(a.extent(), max_size);
        if factor > 1 {
            debug!(factor, extent = %a.extent(), "downsampling before SSIM");
            gray_a = gray::downsample(&gray_a, factor);
            gray_b = gray::downsample(&gray_b, factor);
        }
    }

    let extent = gray_a.extent();
    let too_small = match options.variant {
        SsimVariant::Original => extent.width < options.window_size || extent.height < options.window_size,
        SsimVariant::Bezkrovny => extent.is_empty(),
    };
    if too_small {
        return Err(SsimError::ImageTooSmall {
            extent,
            window: options.window_size,
        });
    }

    let (c1, c2) = options.constants();
    let ssim_map = match options.variant {
        SsimVariant::Original => original::ssim_map(&gray_a, &gray_b, options.window_size, c1, c2),
        SsimVariant::Bezkrovny => bezkrovny::ssim_map(&gray_a, &gray_b, options.window_size, c1, c2),
    };
    let mssim = ssim_map.mean();
    let elapsed = start.elapsed();

    debug!(
        variant = %options.variant,
        window = options.window_size,
        map = %ssim_map.extent(),
        mssim,
        ?elapsed,
        "SSIM computed"
    );

    Ok(SsimResult {
        mssim,
        ssim_map,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32, cell: u32, dark: u8, light: u8) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = if (x / cell + y / cell) % 2 == 0 { dark } else { light };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelBuffer::from_raw(width, height, data).unwrap()
    }

    fn harness_options() -> SsimOptions {
        SsimOptions::new().with_window_size(20).with_k1(0.01).with_k2(0.025)
    }

    #[test]
    fn identical_buffers_score_one() {
        let image = checker(64, 48, 5, 10, 240);
        for variant in [SsimVariant::Original, SsimVariant::Bezkrovny] {
            let result = compute_similarity(&image, &image.clone(), &harness_options().with_variant(variant))
                .unwrap();
            assert_eq!(result.mssim, 1.0, "{variant}");
            assert_eq!(result.percentage(), 100.0);
        }
    }

    #[test]
    fn different_buffers_score_below_one() {
        let a = checker(64, 64, 4, 0, 255);
        let b = checker(64, 64, 4, 40, 200);
        let result = compute_similarity(&a, &b, &harness_options()).unwrap();
        assert!(result.mssim < 1.0);
        assert!(result.mssim > 0.0);
        assert_eq!(result.map_extent(), Extent2D::new(45, 45));
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let a = checker(32, 32, 4, 0, 255);
        let b = checker(32, 31, 4, 0, 255);
        assert_eq!(
            compute_similarity(&a, &b, &SsimOptions::default()),
            Err(SsimError::DimensionMismatch {
                left: Extent2D::new(32, 32),
                right: Extent2D::new(32, 31),
            })
        );
    }

    #[test]
    fn image_smaller_than_window() {
        let a = checker(16, 16, 4, 0, 255);
        assert!(matches!(
            compute_similarity(&a, &a, &harness_options()),
            Err(SsimError::ImageTooSmall { window: 20, .. })
        ));
        // Block SSIM only needs a non-empty image.
        let result = compute_similarity(&a, &a, &harness_options().with_variant(SsimVariant::Bezkrovny));
        assert!(result.is_ok());
    }

    #[test]
    fn large_images_are_downsampled() {
        let image = checker(600, 520, 8, 0, 255);
        let result = compute_similarity(&image, &image, &SsimOptions::default()).unwrap();
        // factor round(520 / 256) = 2 gives a 300x260 plane.
        assert_eq!(result.map_extent(), Extent2D::new(290, 250));

        let full = compute_similarity(&image, &image, &SsimOptions::default().with_max_size(None)).unwrap();
        assert_eq!(full.map_extent(), Extent2D::new(590, 510));
    }

    #[test]
    fn invalid_options_rejected_before_work() {
        let a = checker(32, 32, 4, 0, 255);
        assert!(matches!(
            compute_similarity(&a, &a, &SsimOptions::default().with_window_size(0)),
            Err(SsimError::InvalidOptions(_))
        ));
    }
}
