//! Engine instance bound to a canvas.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::{debug, info};

use crate::asset::{AssetSource, FileSystemSource};
use crate::canvas::{Canvas, CanvasBinding};
use crate::error::Result;
use crate::ktx::Ktx2Transcoder;
use crate::render_loop::{FrameCounter, RenderLoop};
use crate::resource::ResourceManager;
use crate::scene::Scene;

/// Engine creation options.
#[derive(Clone)]
pub struct EngineConfig {
    /// Keep the drawing buffer after presenting so it can be read back.
    pub preserve_drawing_buffer: bool,
    /// Render loop rate. Zero renders back to back.
    pub target_fps: u32,
    /// Where resource URLs are fetched from.
    pub asset_source: Arc<dyn AssetSource>,
    /// Transcoder for Basis Universal KTX2 payloads.
    pub transcoder: Option<Arc<dyn Ktx2Transcoder>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preserve_drawing_buffer: false,
            target_fps: 60,
            asset_source: Arc::new(FileSystemSource::new(".")),
            transcoder: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep frames readable after they are presented.
    #[must_use]
    pub fn with_preserve_drawing_buffer(mut self, preserve: bool) -> Self {
        self.preserve_drawing_buffer = preserve;
        self
    }

    /// Set the render loop rate.
    #[must_use]
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps;
        self
    }

    /// Set the source resource URLs are fetched from.
    #[must_use]
    pub fn with_asset_source(mut self, source: Arc<dyn AssetSource>) -> Self {
        self.asset_source = source;
        self
    }

    /// Set the Basis Universal transcoder.
    #[must_use]
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Ktx2Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    /// Use the transcoder built into the crate, if there is one.
    #[must_use]
    pub fn with_default_transcoder(mut self) -> Self {
        self.transcoder = crate::ktx::default_transcoder();
        self
    }

    fn frame_interval(&self) -> Duration {
        if self.target_fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / self.target_fps
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("preserve_drawing_buffer", &self.preserve_drawing_buffer)
            .field("target_fps", &self.target_fps)
            .field("transcoder", &self.transcoder.is_some())
            .finish_non_exhaustive()
    }
}

/// A rendering engine attached to one canvas.
///
/// The render loop started by [`run`](Self::run) keeps going until the
/// engine is dropped, which also releases the canvas.
pub struct Engine {
    canvas: Canvas,
    scene: Arc<RwLock<Scene>>,
    resources: ResourceManager,
    frames: Arc<FrameCounter>,
    frame_interval: Duration,
    render_loop: Option<RenderLoop>,
    _binding: CanvasBinding,
}

impl Engine {
    /// Create an engine on `canvas`.
    ///
    /// Fails if the canvas has no 3D context or another engine holds it.
    pub fn create(canvas: &Canvas, config: EngineConfig) -> Result<Self> {
        let binding = canvas.bind(config.preserve_drawing_buffer)?;
        debug!(canvas = canvas.id(), ?config, "engine created");

        Ok(Self {
            canvas: canvas.clone(),
            scene: Arc::new(RwLock::new(Scene::new())),
            resources: ResourceManager::new(config.asset_source.clone(), config.transcoder.clone()),
            frames: Arc::new(FrameCounter::new()),
            frame_interval: config.frame_interval(),
            render_loop: None,
            _binding: binding,
        })
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Lock the scene for editing.
    pub fn scene_mut(&self) -> RwLockWriteGuard<'_, Scene> {
        self.scene.write()
    }

    pub fn resource_manager(&self) -> &ResourceManager {
        &self.resources
    }

    /// Start the render loop. Does nothing if it is already running.
    pub fn run(&mut self) -> Result<()> {
        if self.render_loop.is_some() {
            return Ok(());
        }
        self.render_loop = Some(RenderLoop::spawn(
            self.canvas.clone(),
            Arc::clone(&self.scene),
            Arc::clone(&self.frames),
            self.frame_interval,
        )?);
        info!(canvas = self.canvas.id(), "render loop running");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.render_loop.is_some()
    }

    /// Frames presented since the engine was created.
    pub fn frames_presented(&self) -> u64 {
        self.frames.get()
    }

    /// Block until `count` frames have been presented or `timeout` elapses.
    pub fn wait_for_frames(&self, count: u64, timeout: Duration) -> bool {
        self.frames.wait_for(count, timeout)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Stop rendering before the canvas binding is released.
        if let Some(mut render_loop) = self.render_loop.take() {
            render_loop.shutdown();
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("canvas", &self.canvas)
            .field("running", &self.is_running())
            .field("frames_presented", &self.frames_presented())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemorySource;
    use crate::camera::Camera;
    use crate::error::EngineError;
    use crate::ktx::tests::rgba8_ktx2;
    use crate::resource::LoadItem;

    #[test]
    fn frame_interval_from_fps() {
        assert_eq!(EngineConfig::new().frame_interval(), Duration::from_secs(1) / 60);
        assert_eq!(
            EngineConfig::new().with_target_fps(0).frame_interval(),
            Duration::ZERO
        );
    }

    #[test]
    fn second_engine_on_canvas_is_rejected() {
        let canvas = Canvas::new("shared", 4, 4);
        let engine = Engine::create(&canvas, EngineConfig::new()).unwrap();
        assert!(matches!(
            Engine::create(&canvas, EngineConfig::new()),
            Err(EngineError::CanvasInUse(_))
        ));
        drop(engine);
        assert!(Engine::create(&canvas, EngineConfig::new()).is_ok());
    }

    #[test]
    fn run_is_idempotent_and_drop_stops_loop() {
        let canvas = Canvas::new("run", 2, 2);
        let mut engine = Engine::create(
            &canvas,
            EngineConfig::new().with_preserve_drawing_buffer(true).with_target_fps(0),
        )
        .unwrap();
        {
            let mut scene = engine.scene_mut();
            let root = scene.create_root_entity("root");
            scene.add_camera(root, Camera::default()).unwrap();
        }
        assert_eq!(engine.frames_presented(), 0);
        engine.run().unwrap();
        engine.run().unwrap();
        assert!(engine.is_running());
        assert!(engine.wait_for_frames(2, Duration::from_secs(5)));
        drop(engine);

        // The canvas is free again and its last frame is still readable.
        assert!(Engine::create(&canvas, EngineConfig::new()).is_ok());
        assert!(!canvas.read_pixels(0, 0, 2, 2).unwrap().is_blank());
    }

    #[test]
    fn texture_background_is_read_back() {
        let texels = [10, 20, 30, 255, 40, 50, 60, 255];
        let source = MemorySource::new().with_asset("/t.ktx2", rgba8_ktx2(2, 1, &texels));
        let canvas = Canvas::new("bg", 8, 8);
        let mut engine = Engine::create(
            &canvas,
            EngineConfig::new()
                .with_preserve_drawing_buffer(true)
                .with_asset_source(Arc::new(source)),
        )
        .unwrap();

        let texture = engine.resource_manager().load(&LoadItem::new("/t.ktx2")).unwrap();
        canvas.set_size(texture.width(), texture.height());
        {
            let mut scene = engine.scene_mut();
            let root = scene.create_root_entity("root");
            scene.add_camera(root, Camera::default()).unwrap();
            scene.background.set_texture(texture);
        }
        engine.run().unwrap();
        assert!(engine.wait_for_frames(1, Duration::from_secs(5)));

        let pixels = canvas.read_pixels(0, 0, 2, 1).unwrap();
        assert_eq!(pixels.as_bytes(), &texels);
    }
}
