//! Scene graph: entities, transforms, lighting and background.

use glam::{Mat4, Quat, Vec3, Vec4};
use texsim_core::Extent2D;

use crate::camera::Camera;
use crate::error::{EngineError, Result};
use crate::texture::Texture2D;

/// Handle to an entity in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(usize);

/// Local transform of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Rotate so that -Z points from the current position toward `target`.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let view = Mat4::look_at_rh(self.position, target, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        self.rotation = rotation;
    }

    /// Direction the entity faces.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[derive(Debug, Clone)]
struct Entity {
    name: String,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    transform: Transform,
    camera: Option<Camera>,
}

/// Uniform ambient lighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub diffuse_solid_color: Vec4,
    pub diffuse_intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            diffuse_solid_color: Vec4::new(0.212, 0.227, 0.259, 1.0),
            diffuse_intensity: 1.0,
        }
    }
}

/// What the camera clears the frame to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundMode {
    #[default]
    SolidColor,
    Texture,
}

/// How a background texture is fitted to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundTextureFillMode {
    /// Stretch to cover the whole frame.
    Fill,
    /// Scale to the frame width, keeping the aspect ratio.
    AspectFitWidth,
    /// Scale to the frame height, keeping the aspect ratio.
    #[default]
    AspectFitHeight,
}

/// Scene background.
#[derive(Debug, Clone)]
pub struct Background {
    pub mode: BackgroundMode,
    pub solid_color: Vec4,
    pub texture: Option<Texture2D>,
    pub texture_fill_mode: BackgroundTextureFillMode,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            mode: BackgroundMode::SolidColor,
            solid_color: Vec4::new(0.25, 0.25, 0.25, 1.0),
            texture: None,
            texture_fill_mode: BackgroundTextureFillMode::default(),
        }
    }
}

impl Background {
    /// Switch to texture mode showing `texture`.
    pub fn set_texture(&mut self, texture: Texture2D) {
        self.mode = BackgroundMode::Texture;
        self.texture = Some(texture);
    }
}

/// A scene: an entity tree plus lighting and background.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    entities: Vec<Entity>,
    roots: Vec<EntityId>,
    pub ambient_light: AmbientLight,
    pub background: Background,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a top-level entity.
    pub fn create_root_entity(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.push(name.into(), None);
        self.roots.push(id);
        id
    }

    /// Create an entity under `parent`.
    pub fn create_child(&mut self, parent: EntityId, name: impl Into<String>) -> Result<EntityId> {
        self.entity(parent)?;
        let id = self.push(name.into(), Some(parent));
        self.entities[parent.0].children.push(id);
        Ok(id)
    }

    fn push(&mut self, name: String, parent: Option<EntityId>) -> EntityId {
        let id = EntityId(self.entities.len());
        self.entities.push(Entity {
            name,
            parent,
            children: Vec::new(),
            transform: Transform::default(),
            camera: None,
        });
        id
    }

    fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.entities
            .get(id.0)
            .ok_or_else(|| EngineError::InvalidEntity(format!("{id:?}")))
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.entities
            .get_mut(id.0)
            .ok_or_else(|| EngineError::InvalidEntity(format!("{id:?}")))
    }

    pub fn name(&self, id: EntityId) -> Result<&str> {
        Ok(&self.entity(id)?.name)
    }

    pub fn root_entities(&self) -> &[EntityId] {
        &self.roots
    }

    pub fn children(&self, id: EntityId) -> Result<&[EntityId]> {
        Ok(&self.entity(id)?.children)
    }

    pub fn transform(&self, id: EntityId) -> Result<&Transform> {
        Ok(&self.entity(id)?.transform)
    }

    pub fn transform_mut(&mut self, id: EntityId) -> Result<&mut Transform> {
        Ok(&mut self.entity_mut(id)?.transform)
    }

    /// World matrix of an entity, composed through its ancestors.
    pub fn world_matrix(&self, id: EntityId) -> Result<Mat4> {
        let entity = self.entity(id)?;
        let local = entity.transform.local_matrix();
        match entity.parent {
            Some(parent) => Ok(self.world_matrix(parent)? * local),
            None => Ok(local),
        }
    }

    /// Attach a camera component, replacing any existing one.
    pub fn add_camera(&mut self, id: EntityId, camera: Camera) -> Result<()> {
        self.entity_mut(id)?.camera = Some(camera);
        Ok(())
    }

    /// First enabled camera in creation order.
    pub fn active_camera(&self) -> Option<(EntityId, &Camera)> {
        self.entities
            .iter()
            .enumerate()
            .find_map(|(i, e)| e.camera.as_ref().filter(|c| c.enabled).map(|c| (EntityId(i), c)))
    }

    /// View-projection of the active camera for a frame of `extent`.
    ///
    /// `None` without an enabled camera, or when the camera is degenerate
    /// (zero scale in its hierarchy, zero field of view) and the matrix
    /// is not finite.
    pub fn active_view_projection(&self, extent: Extent2D) -> Option<Mat4> {
        let (id, camera) = self.active_camera()?;
        let world = self.world_matrix(id).ok()?;
        let aspect = camera.aspect_for(extent.width, extent.height);
        Some(camera.view_projection_matrix(&world, aspect)).filter(Mat4::is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn child_entities_hang_off_their_parent() {
        let mut scene = Scene::new();
        let root = scene.create_root_entity("root");
        let camera = scene.create_child(root, "camera").unwrap();

        assert_eq!(scene.root_entities(), &[root]);
        assert_eq!(scene.children(root).unwrap(), &[camera]);
        assert_eq!(scene.name(camera).unwrap(), "camera");
    }

    #[test]
    fn invalid_parent_is_rejected() {
        let mut scene = Scene::new();
        let mut other = Scene::new();
        other.create_root_entity("a");
        let foreign = other.create_root_entity("b");
        assert!(matches!(
            scene.create_child(foreign, "child"),
            Err(EngineError::InvalidEntity(_))
        ));
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let mut transform = Transform {
            position: Vec3::splat(10.0),
            ..Default::default()
        };
        transform.look_at(Vec3::ZERO, Vec3::Y);
        let expected = Vec3::splat(-1.0).normalize();
        let forward = transform.forward();
        assert_relative_eq!(forward.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(forward.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(forward.z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut scene = Scene::new();
        let root = scene.create_root_entity("root");
        let child = scene.create_child(root, "child").unwrap();
        scene.transform_mut(root).unwrap().position = Vec3::new(1.0, 0.0, 0.0);
        scene.transform_mut(child).unwrap().position = Vec3::new(0.0, 2.0, 0.0);

        let origin = scene.world_matrix(child).unwrap().transform_point3(Vec3::ZERO);
        assert_relative_eq!(origin.x, 1.0);
        assert_relative_eq!(origin.y, 2.0);
    }

    #[test]
    fn active_camera_skips_disabled() {
        let mut scene = Scene::new();
        assert!(scene.active_camera().is_none());

        let root = scene.create_root_entity("root");
        let first = scene.create_child(root, "first").unwrap();
        let second = scene.create_child(root, "second").unwrap();
        scene
            .add_camera(first, Camera { enabled: false, ..Default::default() })
            .unwrap();
        scene.add_camera(second, Camera::default()).unwrap();

        assert_eq!(scene.active_camera().map(|(id, _)| id), Some(second));
    }

    #[test]
    fn degenerate_camera_has_no_view_projection() {
        let mut scene = Scene::new();
        let extent = Extent2D::new(4, 4);
        assert!(scene.active_view_projection(extent).is_none());

        let root = scene.create_root_entity("root");
        let camera = scene.create_child(root, "camera").unwrap();
        scene.transform_mut(camera).unwrap().position = Vec3::splat(10.0);
        scene.transform_mut(camera).unwrap().look_at(Vec3::ZERO, Vec3::Y);
        scene.add_camera(camera, Camera::default()).unwrap();
        assert!(scene.active_view_projection(extent).is_some());

        scene.transform_mut(root).unwrap().scale = Vec3::ZERO;
        assert!(scene.active_view_projection(extent).is_none());

        scene.transform_mut(root).unwrap().scale = Vec3::ONE;
        scene
            .add_camera(camera, Camera { fov: 0.0, ..Default::default() })
            .unwrap();
        assert!(scene.active_view_projection(extent).is_none());
    }

    #[test]
    fn set_texture_switches_mode() {
        let mut background = Background::default();
        assert_eq!(background.mode, BackgroundMode::SolidColor);
        let texture = Texture2D::from_rgba8(
            1,
            1,
            crate::texture::TextureFormat::R8G8B8A8,
            vec![0, 0, 0, 255],
        )
        .unwrap();
        background.set_texture(texture);
        assert_eq!(background.mode, BackgroundMode::Texture);
        assert!(background.texture.is_some());
    }
}
