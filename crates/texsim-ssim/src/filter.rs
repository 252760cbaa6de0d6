//! Separable window filtering.

use rayon::prelude::*;

use crate::gray::Plane;

/// Normalised 1D Gaussian of `size` taps centred on the middle of the window.
///
/// The outer product with itself is the 2D `size` x `size` window.
pub fn gaussian_window(size: u32, sigma: f64) -> Vec<f64> {
    let center = (f64::from(size) - 1.0) / 2.0;
    let taps: Vec<f64> = (0..size)
        .map(|i| {
            let x = f64::from(i) - center;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = taps.iter().sum();
    taps.into_iter().map(|t| t / sum).collect()
}

/// Correlate `plane` with the separable window `kernel` x `kernel`, keeping
/// only positions where the window lies fully inside the image.
///
/// The caller guarantees the plane is at least `kernel.len()` on each side.
pub fn filter_valid(plane: &Plane, kernel: &[f64]) -> Plane {
    let k = kernel.len();
    let out_w = plane.width as usize + 1 - k;
    let out_h = plane.height as usize + 1 - k;
    let in_w = plane.width as usize;

    // Horizontal pass over every input row.
    let mut horizontal = vec![0.0; out_w * plane.height as usize];
    horizontal
        .par_chunks_mut(out_w)
        .zip(plane.data.par_chunks(in_w))
        .for_each(|(out, row)| {
            for (x, value) in out.iter_mut().enumerate() {
                *value = row[x..x + k].iter().zip(kernel).map(|(a, w)| a * w).sum();
            }
        });

    // Vertical pass.
    let mut data = vec![0.0; out_w * out_h];
    data.par_chunks_mut(out_w).enumerate().for_each(|(y, out)| {
        for (x, value) in out.iter_mut().enumerate() {
            *value = kernel
                .iter()
                .enumerate()
                .map(|(i, w)| horizontal[(y + i) * out_w + x] * w)
                .sum();
        }
    });

    Plane::new(out_w as u32, out_h as u32, data)
}
