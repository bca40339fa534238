//! Builders for cubes, spheres and lights
//!
//! The factory owns the base meshes and a per-type name counter. Every
//! object it builds is registered right away; callers get back handles, never
//! the objects themselves.

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::foundation::math::{Transform, Vec3};
use crate::render::assets::Assets;
use crate::render::lighting::{Light, LightData, LightError, LightKey, LightTier, LightType};
use crate::render::mesh::{Mesh, MeshLibrary};
use crate::scene::registry::RegistryError;
use crate::scene::scene_object::{Mobility, ObjectHandle, SceneObject};
use crate::scene::Scene;

/// Material applied to new cubes
pub const CUBE_MATERIAL: &str = "leather";
/// Material applied to new spheres
pub const SPHERE_MATERIAL: &str = "marble";
/// Material applied to light markers
pub const LIGHT_MATERIAL: &str = "gold";

const CUBE_SCALE: f32 = 7.5;
const SPHERE_SCALE: f32 = 3.5;
const DEFAULT_LIGHT_POSITION: [f32; 3] = [7.0, 7.0, 7.0];

/// Factory errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    /// Mesh library has no mesh of this name
    #[error("unknown mesh '{0}'")]
    UnknownMesh(String),

    /// Registration failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Light could not be placed
    #[error(transparent)]
    Light(#[from] LightError),
}

/// Hands out `type_N` names with one counter per type
#[derive(Debug, Default, Clone)]
pub struct NameGenerator {
    counters: HashMap<String, u32>,
}

impl NameGenerator {
    /// Generator with every counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Next name for `kind`, starting at `kind_1`
    pub fn next(&mut self, kind: &str) -> String {
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        *counter += 1;
        format!("{kind}_{counter}")
    }

    /// Names issued so far for `kind`
    pub fn issued(&self, kind: &str) -> u32 {
        self.counters.get(kind).copied().unwrap_or(0)
    }

    /// Restart every counter
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}

/// Handles of a light and its marker object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightHandles {
    /// Marker sphere in the object registry
    pub object: ObjectHandle,
    /// Light in the tier manager
    pub light: LightKey,
}

/// Creates and registers scene objects and lights
#[derive(Debug)]
pub struct SceneObjectFactory {
    names: NameGenerator,
    meshes: MeshLibrary,
    default_shader: String,
}

impl Default for SceneObjectFactory {
    fn default() -> Self {
        Self::new("basic")
    }
}

impl SceneObjectFactory {
    /// Factory with the base meshes registered, drawing with `default_shader`
    pub fn new(default_shader: impl Into<String>) -> Self {
        Self {
            names: NameGenerator::new(),
            meshes: MeshLibrary::with_base_meshes(),
            default_shader: default_shader.into(),
        }
    }

    /// Base and user meshes
    pub fn meshes(&self) -> &MeshLibrary {
        &self.meshes
    }

    /// Register an extra mesh for [`Self::create_object`]
    pub fn add_mesh(&mut self, mesh: Mesh) -> Rc<Mesh> {
        self.meshes.insert(mesh)
    }

    /// Name counters
    pub fn names(&self) -> &NameGenerator {
        &self.names
    }

    /// Build and register an object named `<kind>_N` from a library mesh
    pub fn create_object(
        &mut self,
        scene: &mut Scene,
        assets: &Assets,
        kind: &str,
        mesh: &str,
        material: &str,
        transform: Transform,
    ) -> Result<ObjectHandle, FactoryError> {
        let object = self.build(assets, kind, mesh, material, transform)?;
        Ok(scene.objects.create(object)?)
    }

    /// Leather cube at the origin
    pub fn create_cube(&mut self, scene: &mut Scene, assets: &Assets) -> Result<ObjectHandle, FactoryError> {
        self.create_cube_at(scene, assets, Vec3::zeros())
    }

    /// Leather cube at `position`
    pub fn create_cube_at(&mut self, scene: &mut Scene, assets: &Assets, position: Vec3) -> Result<ObjectHandle, FactoryError> {
        let transform = Transform::new(position, Vec3::zeros(), Vec3::repeat(CUBE_SCALE));
        self.create_object(scene, assets, "cube", "cube", CUBE_MATERIAL, transform)
    }

    /// Marble sphere at the origin
    pub fn create_sphere(&mut self, scene: &mut Scene, assets: &Assets) -> Result<ObjectHandle, FactoryError> {
        self.create_sphere_at(scene, assets, Vec3::zeros())
    }

    /// Marble sphere at `position`
    pub fn create_sphere_at(&mut self, scene: &mut Scene, assets: &Assets, position: Vec3) -> Result<ObjectHandle, FactoryError> {
        let transform = Transform::new(position, Vec3::zeros(), Vec3::repeat(SPHERE_SCALE));
        self.create_object(scene, assets, "sphere", "sphere", SPHERE_MATERIAL, transform)
    }

    /// Static light of `light_type` at the default light position
    pub fn create_light(
        &mut self,
        scene: &mut Scene,
        assets: &Assets,
        light_type: LightType,
    ) -> Result<LightHandles, FactoryError> {
        self.create_light_at(scene, assets, light_type, Vec3::from(DEFAULT_LIGHT_POSITION), Mobility::Static)
    }

    /// Light with a gold marker sphere named after its type
    ///
    /// Tier capacity is checked before anything is registered, so a rejected
    /// light leaves no orphan marker behind.
    pub fn create_light_at(
        &mut self,
        scene: &mut Scene,
        assets: &Assets,
        light_type: LightType,
        position: Vec3,
        mobility: Mobility,
    ) -> Result<LightHandles, FactoryError> {
        let tier = LightTier::from_mobility(mobility);
        if !scene.lights.has_room(tier) {
            let capacity = scene.lights.capacity(tier).unwrap_or(0);
            log::warn!("Cannot create {} light: {} tier is full ({})", light_type, tier, capacity);
            return Err(LightError::TierFull { tier, capacity }.into());
        }

        let transform = Transform::new(position, Vec3::zeros(), Vec3::repeat(SPHERE_SCALE));
        let object = self
            .build(assets, light_type.as_str(), "sphere", LIGHT_MATERIAL, transform)?
            .with_mobility(mobility);
        let handle = scene.objects.create(object)?;

        let light = Light::new(light_type, LightData::at(position)).with_visual(handle);
        match scene.lights.add(light, mobility) {
            Ok(key) => Ok(LightHandles { object: handle, light: key }),
            Err(e) => {
                scene.objects.mark_handle_for_deletion(handle);
                Err(e.into())
            }
        }
    }

    /// Spot light, point light and two cubes
    pub fn setup_default_scene(&mut self, scene: &mut Scene, assets: &Assets) -> Result<(), FactoryError> {
        self.create_light(scene, assets, LightType::Spot)?;
        self.create_light_at(scene, assets, LightType::Point, Vec3::new(-7.0, 7.0, 7.0), Mobility::Static)?;
        self.create_cube(scene, assets)?;
        self.create_cube_at(scene, assets, Vec3::new(15.0, 0.0, 0.0))?;
        log::info!("Default scene ready with {} objects", scene.objects.len());
        Ok(())
    }

    fn build(
        &mut self,
        assets: &Assets,
        kind: &str,
        mesh: &str,
        material: &str,
        transform: Transform,
    ) -> Result<SceneObject, FactoryError> {
        let mesh = self
            .meshes
            .get(mesh)
            .ok_or_else(|| FactoryError::UnknownMesh(mesh.to_string()))?;

        let mut object = SceneObject::new(self.names.next(kind), mesh)
            .with_transform(transform)
            .with_material(assets.materials.instance(material));
        match assets.shaders.get_or_fallback(&self.default_shader) {
            Some(shader) => object.set_shader(shader),
            None => log::warn!("Object '{}' created without a shader", object.name()),
        }
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_generator_counts_per_type() {
        let mut names = NameGenerator::new();
        assert_eq!(names.next("cube"), "cube_1");
        assert_eq!(names.next("cube"), "cube_2");
        assert_eq!(names.next("spot"), "spot_1");
        assert_eq!(names.issued("cube"), 2);

        names.reset();
        assert_eq!(names.next("cube"), "cube_1");
    }

    #[test]
    fn test_unknown_mesh() {
        let mut factory = SceneObjectFactory::default();
        let mut scene = Scene::default();
        let assets = Assets::headless();

        let result = factory.create_object(&mut scene, &assets, "thing", "teapot", "gold", Transform::identity());
        assert_eq!(result, Err(FactoryError::UnknownMesh("teapot".to_string())));
        assert!(scene.objects.is_empty());
    }
}
