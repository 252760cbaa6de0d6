//! Software rendering engine for texsim.
//!
//! A minimal engine in the shape of a browser 3D engine: an [`Engine`] binds
//! to a [`Canvas`], owns a [`Scene`] with a camera and a background, loads
//! textures through a [`ResourceManager`] and runs a render loop on its own
//! thread. Frames can be read back from the canvas with
//! [`Canvas::read_pixels`].
//!
//! Supported texture inputs:
//! - PNG, JPEG and the other formats the `image` crate decodes
//! - KTX2 containers with uncompressed 8-bit payloads, optionally
//!   Zstandard or ZLIB supercompressed
//! - Basis Universal KTX2 payloads through a [`Ktx2Transcoder`]. With the
//!   default `basis-universal` feature, UASTC is transcoded by
//!   `BasisUniversalTranscoder`; ETC1S needs a user-supplied transcoder.

pub mod asset;
#[cfg(feature = "basis-universal")]
pub mod basis;
pub mod camera;
pub mod canvas;
pub mod engine;
pub mod error;
pub mod ktx;
pub mod render_loop;
pub mod renderer;
pub mod resource;
pub mod scene;
pub mod texture;

pub use asset::{AssetSource, FileSystemSource, MemorySource};
#[cfg(feature = "basis-universal")]
pub use basis::BasisUniversalTranscoder;
pub use camera::Camera;
pub use canvas::Canvas;
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, Result};
pub use ktx::{default_transcoder, BasisFormat, Ktx2Transcoder, TranscodeRequest};
pub use render_loop::FrameCounter;
pub use resource::{AssetType, LoadItem, ResourceManager, TextureParams};
pub use scene::{
    AmbientLight, Background, BackgroundMode, BackgroundTextureFillMode, EntityId, Scene, Transform,
};
pub use texture::{Ktx2TargetFormat, Texture2D, TextureFormat};
