//! Render a texture on a canvas and read it back.

use std::sync::Arc;

use glam::{Vec3, Vec4};
use texsim_core::PixelBuffer;
use texsim_engine::{
    Camera, Canvas, Engine, EngineConfig, LoadItem, Texture2D, TextureFormat, TextureParams,
};
use tracing::{debug, debug_span, info};

use crate::clock::{Clock, SystemClock};
use crate::config::HarnessConfig;
use crate::settle::SettlePolicy;
use crate::{HarnessError, Result};

/// Camera placement used for every load.
pub const CAMERA_POSITION: Vec3 = Vec3::new(10.0, 10.0, 10.0);
/// Ambient light intensity used for every load.
pub const AMBIENT_INTENSITY: f32 = 1.2;

/// Pixels read back after rendering one texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub url: String,
    /// Format the texture asset was stored in.
    pub format: TextureFormat,
    pub pixels: PixelBuffer,
}

impl LoadedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Loads textures into a fresh engine per call and reads the rendered frame.
#[derive(Clone)]
pub struct TextureLoader {
    engine_config: EngineConfig,
    params: TextureParams,
    settle: SettlePolicy,
    clock: Arc<dyn Clock>,
}

impl TextureLoader {
    /// Loader with the given engine options. The drawing buffer is always
    /// preserved so frames can be read after presentation.
    pub fn new(engine_config: EngineConfig) -> Self {
        Self {
            engine_config: engine_config.with_preserve_drawing_buffer(true),
            params: TextureParams::default(),
            settle: SettlePolicy::default(),
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Loader resolving assets under the config's asset root, with the
    /// engine's built-in Basis Universal transcoder installed.
    pub fn from_config(config: &HarnessConfig) -> Self {
        let source = texsim_engine::FileSystemSource::new(config.asset_root.clone());
        let engine_config = EngineConfig::new()
            .with_asset_source(Arc::new(source))
            .with_default_transcoder();
        Self::new(engine_config).with_settle_policy(config.settle.policy())
    }

    #[must_use]
    pub fn with_settle_policy(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Transcode hints passed through to the resource manager.
    #[must_use]
    pub fn with_texture_params(mut self, params: TextureParams) -> Self {
        self.params = params;
        self
    }

    pub fn settle_policy(&self) -> SettlePolicy {
        self.settle
    }

    /// Render `url` on `canvas` and return the frame read back from it.
    ///
    /// The canvas is resized to the texture. The engine and its render loop
    /// are torn down before this returns.
    pub fn load(&self, canvas: &Canvas, url: &str) -> Result<LoadedImage> {
        let _span = debug_span!("load", canvas = canvas.id(), url).entered();

        let mut engine = Engine::create(canvas, self.engine_config.clone())?;
        canvas.resize_by_client_size();
        build_scene(&engine)?;

        let item = LoadItem::new(url).with_params(self.params.clone());
        let texture = engine
            .resource_manager()
            .load(&item)
            .map_err(|source| HarnessError::Load {
                url: url.to_string(),
                source,
            })?;
        let (width, height) = (texture.width(), texture.height());
        let format = texture.format();

        canvas.set_size(width, height);
        info!("width: {width} height: {height} format: {format}");
        show_texture(&engine, texture);

        engine.run()?;
        self.settle.settle(&engine, self.clock.as_ref(), url)?;

        let pixels = canvas.read_pixels(0, 0, width, height)?;
        debug!(frames = engine.frames_presented(), "frame read back");
        Ok(LoadedImage {
            url: url.to_string(),
            format,
            pixels,
        })
    }
}

impl std::fmt::Debug for TextureLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureLoader")
            .field("engine_config", &self.engine_config)
            .field("params", &self.params)
            .field("settle", &self.settle)
            .finish_non_exhaustive()
    }
}

fn build_scene(engine: &Engine) -> Result<()> {
    let mut scene = engine.scene_mut();
    let root = scene.create_root_entity("root");
    let camera = scene.create_child(root, "camera")?;

    let transform = scene.transform_mut(camera)?;
    transform.position = CAMERA_POSITION;
    transform.look_at(Vec3::ZERO, Vec3::Y);
    scene.add_camera(camera, Camera::default())?;

    scene.ambient_light.diffuse_solid_color = Vec4::ONE;
    scene.ambient_light.diffuse_intensity = AMBIENT_INTENSITY;
    Ok(())
}

fn show_texture(engine: &Engine, texture: Texture2D) {
    engine.scene_mut().background.set_texture(texture);
}
