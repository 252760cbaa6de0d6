//! Block SSIM over non-overlapping windows.

use rayon::prelude::*;

use crate::gray::Plane;
use crate::original::ssim_value;

/// One SSIM value per `window_size` block. Blocks on the right and bottom
/// edges are clipped to the image.
pub(crate) fn ssim_map(a: &Plane, b: &Plane, window_size: u32, c1: f64, c2: f64) -> Plane {
    let map_w = a.width.div_ceil(window_size);
    let map_h = a.height.div_ceil(window_size);
    let mut data = vec![0.0; map_w as usize * map_h as usize];

    data.par_chunks_mut(map_w as usize)
        .enumerate()
        .for_each(|(by, row)| {
            let y0 = by as u32 * window_size;
            let y1 = (y0 + window_size).min(a.height);
            for (bx, out) in row.iter_mut().enumerate() {
                let x0 = bx as u32 * window_size;
                let x1 = (x0 + window_size).min(a.width);
                *out = block_ssim(a, b, (x0, x1), (y0, y1), c1, c2);
            }
        });

    Plane::new(map_w, map_h, data)
}

fn block_ssim(a: &Plane, b: &Plane, (x0, x1): (u32, u32), (y0, y1): (u32, u32), c1: f64, c2: f64) -> f64 {
    let n = f64::from((x1 - x0) * (y1 - y0));
    let samples = || (y0..y1).flat_map(move |y| (x0..x1).map(move |x| (a.get(x, y), b.get(x, y))));

    let (sum1, sum2) = samples().fold((0.0, 0.0), |(s1, s2), (p, q)| (s1 + p, s2 + q));
    let (m1, m2) = (sum1 / n, sum2 / n);

    let (v1, v2, cov) = samples().fold((0.0, 0.0, 0.0), |(v1, v2, cov), (p, q)| {
        let (dp, dq) = (p - m1, q - m2);
        (v1 + dp * dp, v2 + dq * dq, cov + dp * dq)
    });

    ssim_value(m1, m2, v1 / n, v2 / n, cov / n, c1, c2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn edge_blocks_are_clipped() {
        let plane = Plane::new(10, 5, (0..50).map(f64::from).collect());
        let map = ssim_map(&plane, &plane, 4, 6.5025, 58.5225);
        assert_eq!((map.width, map.height), (3, 2));
        assert!(map.data.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn flat_blocks_compare_luminance() {
        let a = Plane::new(2, 2, vec![100.0; 4]);
        let b = Plane::new(2, 2, vec![200.0; 4]);
        let map = ssim_map(&a, &b, 2, 0.0, 0.0);
        // (2 * 100 * 200) / (100^2 + 200^2)
        assert_relative_eq!(map.data[0], 0.8);
    }
}
