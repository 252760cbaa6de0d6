//! texsim: render two textures and report their SSIM.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p texsim-cli -- [OPTIONS] [REFERENCE] [CANDIDATE]
//! ```
//!
//! Without arguments, compares `/test/test.png` against
//! `/test/test-uastc.ktx2` under the current directory and prints
//! `"<A> vs <B> <pct>%"`.
//!
//! KTX2 inputs may be uncompressed, Zstandard/ZLIB supercompressed or
//! UASTC. ETC1S (BasisLZ) files are rejected with an unsupported-format
//! error; re-encode them as UASTC (`toktx --encode uastc`).
//!
//! ## Examples
//!
//! ```bash
//! # Compare with a pass threshold; exits with status 1 below 98%
//! cargo run -p texsim-cli -- --asset-root assets --threshold 98
//!
//! # Block SSIM with a smaller window, saving both frames
//! cargo run -p texsim-cli -- --variant bezkrovny --window-size 8 --save-frames out/
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use texsim_engine::Canvas;
use texsim_ssim::SsimVariant;
use texsim_test::output::{frame_file_name, save_frame, save_ssim_map};
use texsim_test::{Comparator, HarnessConfig, RenderTarget, SettleMode, TargetConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Displayed size of the offscreen canvases before they take the texture size.
const CANVAS_WIDTH: u32 = 300;
const CANVAS_HEIGHT: u32 = 150;

#[derive(Parser, Debug)]
#[command(
    name = "texsim",
    about = "Render two textures and compare them with SSIM",
    after_help = "KTX2 candidates must be uncompressed, Zstandard/ZLIB supercompressed or UASTC; \
                  ETC1S (BasisLZ) is not supported.",
    version
)]
struct Args {
    /// Reference texture URL [default: /test/test.png].
    reference: Option<String>,
    /// Candidate texture URL [default: /test/test-uastc.ktx2].
    candidate: Option<String>,

    /// TOML configuration file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory asset URLs are resolved against.
    #[arg(long)]
    asset_root: Option<PathBuf>,

    /// SSIM window size in pixels.
    #[arg(long)]
    window_size: Option<u32>,
    #[arg(long)]
    k1: Option<f64>,
    #[arg(long)]
    k2: Option<f64>,
    /// SSIM variant: original or bezkrovny.
    #[arg(long)]
    variant: Option<SsimVariant>,

    /// Settle delay before readback, in milliseconds.
    #[arg(long)]
    settle_ms: Option<u64>,
    /// Read back after the delay without waiting for a presented frame.
    #[arg(long)]
    fixed_delay: bool,

    /// Minimum passing score, as a percentage.
    #[arg(long)]
    threshold: Option<f64>,

    /// Write the SSIM map as a grayscale PNG.
    #[arg(long, value_name = "PNG")]
    ssim_map: Option<PathBuf>,
    /// Write both read-back frames as PNG into this directory.
    #[arg(long, value_name = "DIR")]
    save_frames: Option<PathBuf>,
}

impl Args {
    /// Configuration file (or defaults) with command-line overrides applied.
    fn resolve_config(&self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        if let Some(url) = &self.reference {
            config.reference = TargetConfig::new(url.clone());
        }
        if let Some(url) = &self.candidate {
            config.candidate = TargetConfig::new(url.clone());
        }
        if let Some(root) = &self.asset_root {
            config.asset_root.clone_from(root);
        }
        if let Some(window_size) = self.window_size {
            config.similarity.window_size = window_size;
        }
        if let Some(k1) = self.k1 {
            config.similarity.k1 = k1;
        }
        if let Some(k2) = self.k2 {
            config.similarity.k2 = k2;
        }
        if let Some(variant) = self.variant {
            config.similarity.variant = variant;
        }
        if let Some(delay) = self.settle_ms {
            config.settle.delay_ms = delay;
        }
        if self.fixed_delay {
            config.settle.mode = SettleMode::Fixed;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = Some(threshold);
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(&Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the comparison passed.
fn run(args: &Args) -> anyhow::Result<bool> {
    let config = args.resolve_config()?;
    info!(
        reference = %config.reference.url,
        candidate = %config.candidate.url,
        root = %config.asset_root.display(),
        "comparing textures"
    );

    let reference = RenderTarget::new(Canvas::new("reference", CANVAS_WIDTH, CANVAS_HEIGHT), &config.reference.url)
        .with_label(config.reference.label());
    let candidate = RenderTarget::new(Canvas::new("candidate", CANVAS_WIDTH, CANVAS_HEIGHT), &config.candidate.url)
        .with_label(config.candidate.label());

    let comparison = Comparator::from_config(&config)
        .compare(&reference, &candidate)
        .context("comparison failed")?;

    if let Some(dir) = &args.save_frames {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        for (prefix, image) in [("reference", &comparison.a), ("candidate", &comparison.b)] {
            let path = dir.join(frame_file_name(prefix, &image.url));
            save_frame(&image.pixels, &path).with_context(|| format!("saving {}", path.display()))?;
        }
    }
    if let Some(path) = &args.ssim_map {
        save_ssim_map(&comparison.similarity.ssim_map, path)
            .with_context(|| format!("saving {}", path.display()))?;
    }

    Ok(comparison.passed())
}
