//! Waiting for the render loop before readback.

use std::time::Duration;

use texsim_core::constants::DEFAULT_SETTLE_DELAY_MS;
use texsim_engine::Engine;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::{HarnessError, Result};

/// How long to let a running engine render before reading its canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Sleep for a fixed time and read whatever is on the canvas.
    FixedDelay(Duration),
    /// Sleep for `min_delay`, then wait for the first presented frame.
    FirstFrame { min_delay: Duration, timeout: Duration },
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::FirstFrame {
            min_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            timeout: Duration::from_secs(5),
        }
    }
}

impl SettlePolicy {
    /// Minimum time slept on the clock.
    pub fn min_delay(&self) -> Duration {
        match *self {
            Self::FixedDelay(delay) => delay,
            Self::FirstFrame { min_delay, .. } => min_delay,
        }
    }

    /// Block until `engine` has settled. `url` names the texture in errors.
    pub fn settle(&self, engine: &Engine, clock: &dyn Clock, url: &str) -> Result<()> {
        let started = clock.now();
        clock.sleep(self.min_delay());

        match *self {
            Self::FixedDelay(_) => {
                if engine.frames_presented() == 0 {
                    warn!(url, "no frame presented before readback");
                }
            }
            Self::FirstFrame { timeout, .. } => {
                if !engine.wait_for_frames(1, timeout) {
                    return Err(HarnessError::FrameTimeout {
                        url: url.to_string(),
                        timeout,
                    });
                }
            }
        }
        debug!(
            url,
            waited = ?clock.now().saturating_sub(started),
            frames = engine.frames_presented(),
            "render settled"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use texsim_engine::{Camera, Canvas, EngineConfig};

    fn engine_with_camera(canvas: &Canvas) -> Engine {
        let engine = Engine::create(canvas, EngineConfig::new()).unwrap();
        {
            let mut scene = engine.scene_mut();
            let root = scene.create_root_entity("root");
            scene.add_camera(root, Camera::default()).unwrap();
        }
        engine
    }

    #[test]
    fn default_waits_for_first_frame() {
        assert_eq!(
            SettlePolicy::default(),
            SettlePolicy::FirstFrame {
                min_delay: Duration::from_millis(200),
                timeout: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn first_frame_sleeps_then_waits_for_frame() {
        let canvas = Canvas::new("settle", 2, 2);
        let mut engine = engine_with_camera(&canvas);
        engine.run().unwrap();

        let clock = ManualClock::new();
        SettlePolicy::default().settle(&engine, &clock, "/a.png").unwrap();
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(200)]);
        assert!(engine.frames_presented() >= 1);
    }

    #[test]
    fn first_frame_times_out_without_render_loop() {
        let canvas = Canvas::new("idle", 2, 2);
        let engine = engine_with_camera(&canvas);
        let policy = SettlePolicy::FirstFrame {
            min_delay: Duration::from_millis(200),
            timeout: Duration::from_millis(10),
        };

        let clock = ManualClock::new();
        let err = policy.settle(&engine, &clock, "/a.png").unwrap_err();
        assert!(matches!(err, HarnessError::FrameTimeout { ref url, .. } if url == "/a.png"));
    }

    #[test]
    fn fixed_delay_only_sleeps() {
        let canvas = Canvas::new("fixed", 2, 2);
        let engine = engine_with_camera(&canvas);
        let clock = ManualClock::new();
        SettlePolicy::FixedDelay(Duration::from_millis(50))
            .settle(&engine, &clock, "/a.png")
            .unwrap();
        assert_eq!(clock.total_slept(), Duration::from_millis(50));
    }
}
