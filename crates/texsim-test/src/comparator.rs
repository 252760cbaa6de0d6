//! Load two textures side by side and score their similarity.

use std::thread;

use texsim_core::PixelBuffer;
use texsim_engine::Canvas;
use texsim_ssim::{compute_similarity, SsimOptions, SsimResult};
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::loader::{LoadedImage, TextureLoader};
use crate::{HarnessError, Result};

/// A canvas paired with the texture to render on it.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub canvas: Canvas,
    pub url: String,
    /// Name used in the report.
    pub label: String,
}

impl RenderTarget {
    /// Target labelled with its URL.
    pub fn new(canvas: Canvas, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            canvas,
            label: url.clone(),
            url,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Scores two equally sized pixel buffers.
pub trait SimilarityMetric: Send + Sync {
    fn measure(&self, a: &PixelBuffer, b: &PixelBuffer, options: &SsimOptions) -> Result<SsimResult>;
}

/// SSIM from `texsim-ssim`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ssim;

impl SimilarityMetric for Ssim {
    fn measure(&self, a: &PixelBuffer, b: &PixelBuffer, options: &SsimOptions) -> Result<SsimResult> {
        Ok(compute_similarity(a, b, options)?)
    }
}

/// Result of comparing two render targets.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub label_a: String,
    pub label_b: String,
    pub a: LoadedImage,
    pub b: LoadedImage,
    pub similarity: SsimResult,
    /// Minimum passing percentage, if any.
    pub threshold: Option<f64>,
}

impl Comparison {
    /// Mean SSIM as a percentage.
    pub fn percentage(&self) -> f64 {
        self.similarity.percentage()
    }

    /// `"<labelA> vs <labelB> <percentage>%"` with four decimals.
    pub fn report_line(&self) -> String {
        format!("{} vs {} {:.4}%", self.label_a, self.label_b, self.percentage())
    }

    /// Whether the score reaches the threshold. Always true without one.
    pub fn passed(&self) -> bool {
        self.threshold.map_or(true, |threshold| self.percentage() >= threshold)
    }
}

/// Loads both targets concurrently and compares the frames.
pub struct Comparator {
    loader: TextureLoader,
    metric: Box<dyn SimilarityMetric>,
    options: SsimOptions,
    threshold: Option<f64>,
}

impl Comparator {
    /// Comparator using SSIM with window 20, k1 0.01, k2 0.025.
    pub fn new(loader: TextureLoader) -> Self {
        Self {
            loader,
            metric: Box::new(Ssim),
            options: HarnessConfig::default().similarity.ssim_options(),
            threshold: None,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        let mut comparator =
            Self::new(TextureLoader::from_config(config)).with_options(config.similarity.ssim_options());
        comparator.threshold = config.threshold;
        comparator
    }

    #[must_use]
    pub fn with_metric(mut self, metric: impl SimilarityMetric + 'static) -> Self {
        self.metric = Box::new(metric);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: SsimOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn loader(&self) -> &TextureLoader {
        &self.loader
    }

    pub fn options(&self) -> &SsimOptions {
        &self.options
    }

    /// Load `a` and `b` in parallel, then score them.
    ///
    /// If either load fails the metric is not run and the first error, in
    /// `(a, b)` order, is returned.
    pub fn compare(&self, a: &RenderTarget, b: &RenderTarget) -> Result<Comparison> {
        let (image_a, image_b) = thread::scope(|scope| {
            let load_a = scope.spawn(|| self.loader.load(&a.canvas, &a.url));
            let load_b = scope.spawn(|| self.loader.load(&b.canvas, &b.url));
            (
                load_a.join().map_err(|_| HarnessError::LoaderPanicked(a.url.clone())),
                load_b.join().map_err(|_| HarnessError::LoaderPanicked(b.url.clone())),
            )
        });
        let image_a = image_a??;
        let image_b = image_b??;

        let similarity = self.metric.measure(&image_a.pixels, &image_b.pixels, &self.options)?;
        let comparison = Comparison {
            label_a: a.label.clone(),
            label_b: b.label.clone(),
            a: image_a,
            b: image_b,
            similarity,
            threshold: self.threshold,
        };

        info!("{}", comparison.report_line());
        if !comparison.passed() {
            warn!(
                threshold = ?comparison.threshold,
                score = comparison.percentage(),
                "similarity below threshold"
            );
        }
        Ok(comparison)
    }
}

impl std::fmt::Debug for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparator")
            .field("loader", &self.loader)
            .field("options", &self.options)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}
