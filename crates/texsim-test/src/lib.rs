//! Texture comparison harness for texsim.
//!
//! Renders textures through the engine, reads the frames back and scores
//! them with SSIM. A [`TextureLoader`] handles one canvas; a [`Comparator`]
//! runs two loads concurrently and reports `"<A> vs <B> <pct>%"`.

pub mod clock;
pub mod comparator;
pub mod config;
pub mod loader;
pub mod output;
pub mod settle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use comparator::{Comparator, Comparison, RenderTarget, SimilarityMetric, Ssim};
pub use config::{HarnessConfig, SettleConfig, SettleMode, SimilarityConfig, TargetConfig};
pub use loader::{LoadedImage, TextureLoader};
pub use settle::SettlePolicy;

use std::time::Duration;

use texsim_engine::EngineError;
use texsim_ssim::SsimError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to load '{url}': {source}")]
    Load {
        url: String,
        #[source]
        source: EngineError,
    },
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Similarity computation failed: {0}")]
    Similarity(#[from] SsimError),
    #[error("No frame presented for '{url}' within {timeout:?}")]
    FrameTimeout { url: String, timeout: Duration },
    #[error("Loader thread for '{0}' panicked")]
    LoaderPanicked(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Output error: {0}")]
    Output(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use texsim_engine::{EngineConfig, MemorySource};

    use crate::clock::ManualClock;
    use crate::loader::TextureLoader;

    /// PNG of a horizontal gradient with seed-dependent noise on top.
    pub(crate) fn gradient_png(width: u32, height: u32, seed: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_fn(width, height, |x, y| {
            let mut h = x
                .wrapping_mul(73_856_093)
                ^ y.wrapping_mul(19_349_663)
                ^ seed.wrapping_mul(83_492_791);
            h ^= h >> 13;
            h = h.wrapping_mul(0x5bd1_e995);
            h ^= h >> 15;
            let v = (x * 200 / width.max(1)) as u8 + (h % 48) as u8;
            image::Rgba([v, v, v, 255])
        });
        let mut bytes = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    /// Loader over in-memory assets with a manual clock.
    pub(crate) fn loader_with(assets: &[(&str, Vec<u8>)]) -> (TextureLoader, Arc<ManualClock>) {
        let mut source = MemorySource::new();
        for (url, bytes) in assets {
            source.insert(*url, bytes.clone());
        }
        let clock = Arc::new(ManualClock::new());
        let loader = TextureLoader::new(EngineConfig::new().with_asset_source(Arc::new(source)))
            .with_clock(clock.clone());
        (loader, clock)
    }
}
