//! Asset sources the resource manager fetches bytes from.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::error::{EngineError, Result};

/// Something that can turn an asset URL into bytes.
pub trait AssetSource: Send + Sync {
    /// Fetch the full contents of the asset at `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Serves assets from a directory on disk.
///
/// URLs are resolved relative to `root`: an optional `file://` prefix and
/// leading slashes are stripped, so `/test/test.png` maps to
/// `<root>/test/test.png`.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL to a path under the root.
    pub fn resolve(&self, url: &str) -> Result<PathBuf> {
        if url.contains("://") && !url.starts_with("file://") {
            return Err(EngineError::UnsupportedUrl(url.to_string()));
        }
        let relative = Path::new(url.trim_start_matches("file://").trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(EngineError::UnsupportedUrl(format!(
                "{url} escapes the asset root"
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetSource for FileSystemSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.resolve(url)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::NotFound(format!("{url} ({})", path.display())))
            }
            Err(e) => Err(EngineError::Io(e)),
        }
    }
}

/// Serves assets held in memory, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset, replacing any previous one at the same URL.
    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(normalize(&url.into()).to_string(), bytes);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_asset(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.assets
            .get(normalize(url))
            .cloned()
            .ok_or_else(|| EngineError::NotFound(url.to_string()))
    }
}

fn normalize(url: &str) -> &str {
    url.trim_start_matches('/')
}
