//! SSIM parameters.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SsimError};

/// Which SSIM algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SsimVariant {
    /// Gaussian-weighted sliding window, as in Wang et al. (2004).
    #[default]
    Original,
    /// Non-overlapping square windows with unweighted statistics.
    Bezkrovny,
}

impl SsimVariant {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Bezkrovny => "bezkrovny",
        }
    }
}

impl std::fmt::Display for SsimVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SsimVariant {
    type Err = SsimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "bezkrovny" => Ok(Self::Bezkrovny),
            other => Err(SsimError::InvalidOptions(format!(
                "unknown variant '{other}' (expected 'original' or 'bezkrovny')"
            ))),
        }
    }
}

/// Parameters for [`compute_similarity`](crate::compute_similarity).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsimOptions {
    /// Side length of the square window, in pixels.
    pub window_size: u32,
    /// Luminance stabilisation constant.
    pub k1: f64,
    /// Contrast stabilisation constant.
    pub k2: f64,
    /// Bits per channel; the dynamic range is `2^bit_depth - 1`.
    pub bit_depth: u32,
    pub variant: SsimVariant,
    /// Images whose smaller side exceeds this are box-downsampled first.
    /// `None` disables downsampling.
    pub max_size: Option<u32>,
}

impl Default for SsimOptions {
    fn default() -> Self {
        Self {
            window_size: 11,
            k1: 0.01,
            k2: 0.03,
            bit_depth: 8,
            variant: SsimVariant::Original,
            max_size: Some(256),
        }
    }
}

impl SsimOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_window_size(mut self, window_size: u32) -> Self {
        self.window_size = window_size;
        self
    }

    #[must_use]
    pub fn with_k1(mut self, k1: f64) -> Self {
        self.k1 = k1;
        self
    }

    #[must_use]
    pub fn with_k2(mut self, k2: f64) -> Self {
        self.k2 = k2;
        self
    }

    #[must_use]
    pub fn with_bit_depth(mut self, bit_depth: u32) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    #[must_use]
    pub fn with_variant(mut self, variant: SsimVariant) -> Self {
        self.variant = variant;
        self
    }

    #[must_use]
    pub fn with_max_size(mut self, max_size: Option<u32>) -> Self {
        self.max_size = max_size;
        self
    }

    /// Dynamic range of pixel values.
    pub fn dynamic_range(&self) -> f64 {
        f64::from(self.bit_depth).exp2() - 1.0
    }

    /// Stabilisation constants `(C1, C2)`.
    pub fn constants(&self) -> (f64, f64) {
        let l = self.dynamic_range();
        ((self.k1 * l).powi(2), (self.k2 * l).powi(2))
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(SsimError::InvalidOptions("window_size must be at least 1".into()));
        }
        for (name, k) in [("k1", self.k1), ("k2", self.k2)] {
            if !k.is_finite() || k < 0.0 {
                return Err(SsimError::InvalidOptions(format!(
                    "{name} must be a non-negative number, got {k}"
                )));
            }
        }
        if self.bit_depth == 0 || self.bit_depth > 16 {
            return Err(SsimError::InvalidOptions(format!(
                "bit_depth must be between 1 and 16, got {}",
                self.bit_depth
            )));
        }
        if self.max_size == Some(0) {
            return Err(SsimError::InvalidOptions("max_size must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn variant_parsing() {
        assert_eq!("original".parse::<SsimVariant>().unwrap(), SsimVariant::Original);
        assert_eq!("Bezkrovny".parse::<SsimVariant>().unwrap(), SsimVariant::Bezkrovny);
        assert!(matches!(
            "weber".parse::<SsimVariant>(),
            Err(SsimError::InvalidOptions(_))
        ));
        assert_eq!(SsimVariant::Bezkrovny.to_string(), "bezkrovny");
    }

    #[test]
    fn constants_follow_bit_depth() {
        let options = SsimOptions::new().with_k1(0.01).with_k2(0.025);
        let (c1, c2) = options.constants();
        assert_relative_eq!(c1, (0.01f64 * 255.0).powi(2));
        assert_relative_eq!(c2, (0.025f64 * 255.0).powi(2));
        assert_relative_eq!(options.with_bit_depth(16).dynamic_range(), 65535.0);
    }

    #[test]
    fn validation() {
        assert!(SsimOptions::default().validate().is_ok());
        assert!(SsimOptions::new().with_window_size(0).validate().is_err());
        assert!(SsimOptions::new().with_k1(-0.1).validate().is_err());
        assert!(SsimOptions::new().with_k2(f64::NAN).validate().is_err());
        assert!(SsimOptions::new().with_bit_depth(0).validate().is_err());
        assert!(SsimOptions::new().with_max_size(Some(0)).validate().is_err());
        assert!(SsimOptions::new().with_max_size(None).validate().is_ok());
    }
}
