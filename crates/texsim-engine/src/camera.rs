//! Camera component.

use glam::Mat4;

/// Perspective camera attached to a scene entity.
///
/// The camera's position and orientation come from its entity's transform.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Fixed aspect ratio, or `None` to follow the canvas.
    pub aspect: Option<f32>,
    pub enabled: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 45f32.to_radians(),
            near: 0.1,
            far: 100.0,
            aspect: None,
            enabled: true,
        }
    }
}

impl Camera {
    /// Aspect ratio to render with on a canvas of the given size.
    pub fn aspect_for(&self, width: u32, height: u32) -> f32 {
        self.aspect
            .unwrap_or_else(|| width.max(1) as f32 / height.max(1) as f32)
    }

    /// View matrix for a camera whose entity has the given world matrix.
    pub fn view_matrix(&self, world: &Mat4) -> Mat4 {
        world.inverse()
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Get the view-projection matrix.
    pub fn view_projection_matrix(&self, world: &Mat4, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix(world)
    }
}
