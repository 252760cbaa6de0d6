//! Background render loop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, trace};

use crate::canvas::Canvas;
use crate::error::Result;
use crate::renderer;
use crate::scene::Scene;

/// Count of presented frames, with blocking waits.
#[derive(Debug, Default)]
pub struct FrameCounter {
    presented: Mutex<u64>,
    signal: Condvar,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames presented so far.
    pub fn get(&self) -> u64 {
        *self.presented.lock()
    }

    /// Record one presented frame and wake waiters.
    pub fn advance(&self) -> u64 {
        let mut presented = self.presented.lock();
        *presented += 1;
        self.signal.notify_all();
        *presented
    }

    /// Block until at least `target` frames have been presented.
    ///
    /// Returns false if `timeout` elapses first.
    pub fn wait_for(&self, target: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut presented = self.presented.lock();
        while *presented < target {
            if self.signal.wait_until(&mut presented, deadline).timed_out() {
                return *presented >= target;
            }
        }
        true
    }
}

/// Messages to the render thread.
#[derive(Debug)]
enum LoopRequest {
    Shutdown,
}

/// Handle to a running render loop thread.
///
/// Dropping the handle stops the loop and joins the thread.
pub(crate) struct RenderLoop {
    request_tx: Sender<LoopRequest>,
    thread: Option<JoinHandle<()>>,
}

impl RenderLoop {
    /// Spawn the loop, rendering `scene` into `canvas` every `frame_interval`.
    pub(crate) fn spawn(
        canvas: Canvas,
        scene: Arc<RwLock<Scene>>,
        frames: Arc<FrameCounter>,
        frame_interval: Duration,
    ) -> Result<Self> {
        let (request_tx, request_rx) = channel::bounded::<LoopRequest>(1);
        let name = format!("render-loop-{}", canvas.id());

        let thread = thread::Builder::new().name(name).spawn(move || {
            Self::run(&canvas, &scene, &frames, frame_interval, &request_rx);
        })?;

        Ok(Self {
            request_tx,
            thread: Some(thread),
        })
    }

    fn run(
        canvas: &Canvas,
        scene: &RwLock<Scene>,
        frames: &FrameCounter,
        frame_interval: Duration,
        request_rx: &Receiver<LoopRequest>,
    ) {
        debug!(canvas = canvas.id(), ?frame_interval, "render loop started");
        loop {
            let presented = {
                let scene = scene.read();
                canvas.present_frame(|buffer, extent| renderer::render(&scene, buffer, extent))
            };
            if presented {
                let count = frames.advance();
                trace!(canvas = canvas.id(), frame = count, "frame presented");
            }

            match request_rx.recv_timeout(frame_interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(LoopRequest::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(canvas = canvas.id(), frames = frames.get(), "render loop stopped");
    }

    /// Stop the loop and wait for the thread to exit.
    pub(crate) fn shutdown(&mut self) {
        let _ = self.request_tx.send(LoopRequest::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;

    #[test]
    fn wait_for_times_out_without_frames() {
        let counter = FrameCounter::new();
        assert!(!counter.wait_for(1, Duration::from_millis(10)));
        assert!(counter.wait_for(0, Duration::ZERO));
    }

    #[test]
    fn wait_for_wakes_on_advance() {
        let counter = Arc::new(FrameCounter::new());
        let producer = Arc::clone(&counter);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            producer.advance();
            producer.advance();
        });
        assert!(counter.wait_for(2, Duration::from_secs(5)));
        handle.join().unwrap();
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn loop_presents_frames_until_dropped() {
        let canvas = Canvas::new("loop", 2, 2);
        let _binding = canvas.bind(true).unwrap();
        let mut scene = Scene::new();
        let root = scene.create_root_entity("root");
        scene.add_camera(root, Camera::default()).unwrap();
        let frames = Arc::new(FrameCounter::new());

        let render_loop = RenderLoop::spawn(
            canvas.clone(),
            Arc::new(RwLock::new(scene)),
            Arc::clone(&frames),
            Duration::from_millis(1),
        )
        .unwrap();
        assert!(frames.wait_for(3, Duration::from_secs(5)));
        drop(render_loop);

        let stopped_at = frames.get();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(frames.get(), stopped_at);
        assert_eq!(canvas.read_pixels(0, 0, 1, 1).unwrap().pixel(0, 0), Some([64, 64, 64, 255]));
    }

    #[test]
    fn loop_without_camera_presents_nothing() {
        let canvas = Canvas::new("idle", 2, 2);
        let frames = Arc::new(FrameCounter::new());
        let render_loop = RenderLoop::spawn(
            canvas,
            Arc::new(RwLock::new(Scene::new())),
            Arc::clone(&frames),
            Duration::from_millis(1),
        )
        .unwrap();
        assert!(!frames.wait_for(1, Duration::from_millis(20)));
        drop(render_loop);
    }
}
