//! Gaussian sliding-window SSIM.

use crate::filter::{filter_valid, gaussian_window};
use crate::gray::Plane;

const SIGMA: f64 = 1.5;

/// SSIM map of two equally sized planes, one value per valid window
/// position.
pub(crate) fn ssim_map(a: &Plane, b: &Plane, window_size: u32, c1: f64, c2: f64) -> Plane {
    let window = gaussian_window(window_size, SIGMA);

    let mu1 = filter_valid(a, &window);
    let mu2 = filter_valid(b, &window);
    let sigma1_sq = filter_valid(&a.zip_map(a, |x, y| x * y), &window);
    let sigma2_sq = filter_valid(&b.zip_map(b, |x, y| x * y), &window);
    let sigma12 = filter_valid(&a.zip_map(b, |x, y| x * y), &window);

    let data = (0..mu1.data.len())
        .map(|i| {
            let (m1, m2) = (mu1.data[i], mu2.data[i]);
            let s1 = sigma1_sq.data[i] - m1 * m1;
            let s2 = sigma2_sq.data[i] - m2 * m2;
            let s12 = sigma12.data[i] - m1 * m2;
            ssim_value(m1, m2, s1, s2, s12, c1, c2)
        })
        .collect();

    Plane::new(mu1.width, mu1.height, data)
}

/// SSIM of one window from its statistics.
///
/// With both constants zero the index is undefined where a denominator
/// vanishes; those windows fall back to the luminance term or to 1.
#[inline]
pub(crate) fn ssim_value(m1: f64, m2: f64, s1: f64, s2: f64, s12: f64, c1: f64, c2: f64) -> f64 {
    let numerator1 = 2.0 * m1 * m2 + c1;
    let numerator2 = 2.0 * s12 + c2;
    let denominator1 = m1 * m1 + m2 * m2 + c1;
    let denominator2 = s1 + s2 + c2;

    if c1 > 0.0 && c2 > 0.0 {
        return (numerator1 * numerator2) / (denominator1 * denominator2);
    }
    let denominator = denominator1 * denominator2;
    if denominator > 0.0 {
        (numerator1 * numerator2) / denominator
    } else if denominator1 != 0.0 && denominator2 == 0.0 {
        numerator1 / denominator1
    } else {
        1.0
    }
}
