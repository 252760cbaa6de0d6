//! Harness configuration.
//!
//! A config file is TOML; every key is optional:
//!
//! ```toml
//! asset_root = "assets"
//! threshold = 99.0
//!
//! [reference]
//! url = "/test/test.png"
//!
//! [candidate]
//! url = "/test/test-uastc.ktx2"
//! label = "uastc"
//!
//! [similarity]
//! window_size = 20
//! k1 = 0.01
//! k2 = 0.025
//! variant = "original"
//!
//! [settle]
//! mode = "first-frame"
//! delay_ms = 200
//! timeout_ms = 5000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use texsim_core::constants::DEFAULT_SETTLE_DELAY_MS;
use texsim_ssim::{SsimOptions, SsimVariant};

use crate::settle::SettlePolicy;
use crate::{HarnessError, Result};

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    /// Name used in the report; defaults to the URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TargetConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: None,
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.url)
    }
}

/// Parameters handed to the similarity metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub window_size: u32,
    pub k1: f64,
    pub k2: f64,
    pub variant: SsimVariant,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            k1: 0.01,
            k2: 0.025,
            variant: SsimVariant::Original,
        }
    }
}

impl SimilarityConfig {
    pub fn ssim_options(&self) -> SsimOptions {
        SsimOptions::new()
            .with_window_size(self.window_size)
            .with_k1(self.k1)
            .with_k2(self.k2)
            .with_variant(self.variant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettleMode {
    Fixed,
    #[default]
    FirstFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    pub mode: SettleMode,
    pub delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            mode: SettleMode::FirstFrame,
            delay_ms: DEFAULT_SETTLE_DELAY_MS,
            timeout_ms: 5000,
        }
    }
}

impl SettleConfig {
    pub fn policy(&self) -> SettlePolicy {
        let delay = Duration::from_millis(self.delay_ms);
        match self.mode {
            SettleMode::Fixed => SettlePolicy::FixedDelay(delay),
            SettleMode::FirstFrame => SettlePolicy::FirstFrame {
                min_delay: delay,
                timeout: Duration::from_millis(self.timeout_ms),
            },
        }
    }
}

/// Full harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory asset URLs are resolved against.
    pub asset_root: PathBuf,
    /// Minimum passing score, as a percentage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub reference: TargetConfig,
    pub candidate: TargetConfig,
    pub similarity: SimilarityConfig,
    pub settle: SettleConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            threshold: None,
            reference: TargetConfig::new("/test/test.png"),
            candidate: TargetConfig::new("/test/test-uastc.ktx2"),
            similarity: SimilarityConfig::default(),
            settle: SettleConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| HarnessError::Config(e.to_string()))
    }

    #[must_use]
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    #[must_use]
    pub fn with_reference(mut self, target: TargetConfig) -> Self {
        self.reference = target;
        self
    }

    #[must_use]
    pub fn with_candidate(mut self, target: TargetConfig) -> Self {
        self.candidate = target;
        self
    }

    #[must_use]
    pub fn with_similarity(mut self, similarity: SimilarityConfig) -> Self {
        self.similarity = similarity;
        self
    }

    #[must_use]
    pub fn with_settle(mut self, settle: SettleConfig) -> Self {
        self.settle = settle;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Check values that serde accepts but the harness cannot use.
    pub fn validate(&self) -> Result<()> {
        self.similarity.ssim_options().validate()?;
        if let Some(threshold) = self.threshold {
            if !(0.0..=100.0).contains(&threshold) {
                return Err(HarnessError::Config(format!(
                    "threshold must be a percentage between 0 and 100, got {threshold}"
                )));
            }
        }
        Ok(())
    }
}
