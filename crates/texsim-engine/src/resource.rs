//! Resource loading.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::asset::AssetSource;
use crate::error::Result;
use crate::ktx::{self, Ktx2Transcoder};
use crate::texture::{Ktx2TargetFormat, Texture2D, TextureFormat};

/// Kind of asset a [`LoadItem`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    /// Plain image (PNG, JPEG, ...).
    Texture2D,
    /// KTX2 container.
    Ktx2,
}

impl AssetType {
    /// Guess the asset type from a URL's extension.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ktx2" => Some(Self::Ktx2),
            "png" | "jpg" | "jpeg" | "bmp" | "gif" | "webp" => Some(Self::Texture2D),
            _ => None,
        }
    }

    /// Guess the asset type from leading bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if ktx::is_ktx2(bytes) {
            Self::Ktx2
        } else {
            Self::Texture2D
        }
    }
}

/// Loader hints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureParams {
    /// Transcode targets for Basis Universal KTX2 payloads, most preferred first.
    pub priority_formats: Vec<Ktx2TargetFormat>,
}

/// A request to the resource manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadItem {
    pub url: String,
    pub asset_type: Option<AssetType>,
    pub params: TextureParams,
}

impl LoadItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            asset_type: None,
            params: TextureParams::default(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: TextureParams) -> Self {
        self.params = params;
        self
    }
}

/// Fetches and decodes texture resources for an engine.
#[derive(Clone)]
pub struct ResourceManager {
    source: Arc<dyn AssetSource>,
    transcoder: Option<Arc<dyn Ktx2Transcoder>>,
}

impl ResourceManager {
    pub fn new(source: Arc<dyn AssetSource>, transcoder: Option<Arc<dyn Ktx2Transcoder>>) -> Self {
        Self { source, transcoder }
    }

    /// Fetch and decode a texture.
    pub fn load(&self, item: &LoadItem) -> Result<Texture2D> {
        let bytes = self.source.fetch(&item.url)?;
        let asset_type = item
            .asset_type
            .or_else(|| AssetType::from_url(&item.url))
            .unwrap_or_else(|| AssetType::sniff(&bytes));
        debug!(url = %item.url, ?asset_type, bytes = bytes.len(), "loading texture");

        match asset_type {
            AssetType::Ktx2 => ktx::decode(
                &bytes,
                &item.params.priority_formats,
                self.transcoder.as_deref(),
            ),
            AssetType::Texture2D => {
                let image = image::load_from_memory(&bytes)?.to_rgba8();
                let (width, height) = image.dimensions();
                Texture2D::from_rgba8(width, height, TextureFormat::R8G8B8A8, image.into_raw())
            }
        }
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("transcoder", &self.transcoder.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemorySource;
    use crate::error::EngineError;
    use crate::ktx::tests::rgba8_ktx2;

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn manager(source: MemorySource) -> ResourceManager {
        ResourceManager::new(Arc::new(source), None)
    }

    #[test]
    fn asset_type_from_url() {
        assert_eq!(AssetType::from_url("/test/test.png"), Some(AssetType::Texture2D));
        assert_eq!(AssetType::from_url("/test/a.KTX2"), Some(AssetType::Ktx2));
        assert_eq!(AssetType::from_url("/a.ktx2?v=3"), Some(AssetType::Ktx2));
        assert_eq!(AssetType::from_url("/blob"), None);
    }

    #[test]
    fn loads_png() {
        let resources = manager(MemorySource::new().with_asset("/a.png", png_bytes(3, 2, [1, 2, 3, 255])));
        let texture = resources.load(&LoadItem::new("/a.png")).unwrap();
        assert_eq!((texture.width(), texture.height()), (3, 2));
        assert_eq!(texture.format(), TextureFormat::R8G8B8A8);
        assert_eq!(&texture.pixels()[..4], &[1, 2, 3, 255]);
    }

    #[test]
    fn sniffs_extensionless_assets() {
        let ktx = rgba8_ktx2(1, 1, &[9, 9, 9, 9]);
        let resources = manager(
            MemorySource::new()
                .with_asset("/blob-ktx", ktx)
                .with_asset("/blob-png", png_bytes(1, 1, [0, 0, 0, 255])),
        );
        assert_eq!(
            resources.load(&LoadItem::new("/blob-ktx")).unwrap().pixels(),
            &[9, 9, 9, 9]
        );
        assert!(resources.load(&LoadItem::new("/blob-png")).is_ok());
    }

    #[test]
    fn explicit_type_wins_over_extension() {
        let ktx = rgba8_ktx2(1, 1, &[4, 4, 4, 4]);
        let resources = manager(MemorySource::new().with_asset("/mislabelled.png", ktx));
        assert!(resources.load(&LoadItem::new("/mislabelled.png")).is_err());
        let item = LoadItem::new("/mislabelled.png").with_type(AssetType::Ktx2);
        assert_eq!(resources.load(&item).unwrap().pixels(), &[4, 4, 4, 4]);
    }

    #[test]
    fn missing_asset_propagates() {
        let resources = manager(MemorySource::new());
        assert!(matches!(
            resources.load(&LoadItem::new("/nope.png")),
            Err(EngineError::NotFound(_))
        ));
    }
}
