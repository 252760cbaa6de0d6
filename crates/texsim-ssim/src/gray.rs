//! Grayscale planes.

use rayon::prelude::*;
use texsim_core::{Extent2D, PixelBuffer};

/// Single-channel image of `f64` samples, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f64>,
}

impl Plane {
    pub fn new(width: u32, height: u32, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self { width, height, data }
    }

    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Elementwise combination of two planes of equal size.
    pub fn zip_map(&self, other: &Self, f: impl Fn(f64, f64) -> f64 + Sync) -> Self {
        let data = self
            .data
            .par_iter()
            .zip(other.data.par_iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Self::new(self.width, self.height, data)
    }
}

/// Luma of one RGBA8 pixel, rounded to an integer level. Alpha is ignored.
#[inline]
pub fn luma([r, g, b, _]: [u8; 4]) -> f64 {
    (0.29894 * f64::from(r) + 0.58704 * f64::from(g) + 0.11402 * f64::from(b)).round()
}

/// Convert an RGBA8 buffer to a grayscale plane.
pub fn to_gray(buffer: &PixelBuffer) -> Plane {
    let data = buffer.pixels().par_iter().map(|&px| luma(px)).collect();
    Plane::new(buffer.width(), buffer.height(), data)
}

/// Downsampling factor for an image whose smaller side should not exceed
/// `max_size`.
pub fn downsample_factor(extent: Extent2D, max_size: u32) -> u32 {
    let min_side = f64::from(extent.width.min(extent.height));
    ((min_side / f64::from(max_size)).round() as u32).max(1)
}

/// Average `factor` x `factor` blocks. Edge blocks are clipped to the image.
pub fn downsample(plane: &Plane, factor: u32) -> Plane {
    if factor <= 1 {
        return plane.clone();
    }
    let width = plane.width.div_ceil(factor);
    let height = plane.height.div_ceil(factor);
    let mut data = vec![0.0; width as usize * height as usize];

    data.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(by, row)| {
            let y0 = by as u32 * factor;
            let y1 = (y0 + factor).min(plane.height);
            for (bx, out) in row.iter_mut().enumerate() {
                let x0 = bx as u32 * factor;
                let x1 = (x0 + factor).min(plane.width);
                let mut sum = 0.0;
                for y in y0..y1 {
                    for x in x0..x1 {
                        sum += plane.get(x, y);
                    }
                }
                *out = sum / f64::from((y1 - y0) * (x1 - x0));
            }
        });

    Plane::new(width, height, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn luma_weights() {
        assert_relative_eq!(luma([0, 0, 0, 0]), 0.0);
        assert_relative_eq!(luma([255, 255, 255, 255]), 255.0);
        // 0.29894 * 255 = 76.23
        assert_relative_eq!(luma([255, 0, 0, 255]), 76.0);
        assert_relative_eq!(luma([0, 255, 0, 0]), 150.0);
    }

    #[test]
    fn downsample_factor_rounds() {
        assert_eq!(downsample_factor(Extent2D::new(100, 100), 256), 1);
        assert_eq!(downsample_factor(Extent2D::new(1024, 383), 256), 1);
        assert_eq!(downsample_factor(Extent2D::new(1024, 384), 256), 2);
        assert_eq!(downsample_factor(Extent2D::new(1024, 1024), 256), 4);
    }

    #[test]
    fn downsample_averages_blocks() {
        let plane = Plane::new(3, 2, vec![1.0, 3.0, 5.0, 3.0, 5.0, 7.0]);
        let small = downsample(&plane, 2);
        assert_eq!((small.width, small.height), (2, 1));
        assert_relative_eq!(small.data[0], 3.0);
        assert_relative_eq!(small.data[1], 6.0);
    }
}
