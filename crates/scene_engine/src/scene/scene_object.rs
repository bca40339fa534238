//! Scene objects and the handles that refer to them

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::foundation::math::Transform;
use crate::render::material::Material;
use crate::render::mesh::Mesh;
use crate::render::shader::Shader;
use crate::scene::input::InputBehavior;

/// Registry-assigned object id, unique among live objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Generational reference to a registered object
///
/// The generation is bumped whenever the storage slot is swept, so a handle
/// kept across a sweep stops resolving instead of aliasing whatever object
/// reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    /// Object id at creation time
    pub id: ObjectId,
    /// Storage slot
    pub index: u32,
    /// Slot generation at creation time
    pub generation: u32,
}

/// How often an object (and the light it carries) is expected to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mobility {
    /// Never moves
    #[default]
    Static,
    /// Moves rarely
    Stationary,
    /// Moves every frame
    Dynamic,
    /// Not a light carrier
    NonType,
}

/// Renderable object owned by the scene registry
pub struct SceneObject {
    id: Option<ObjectId>,
    name: String,
    mesh: Rc<Mesh>,
    /// Position, Euler rotation and scale
    pub transform: Transform,
    material: Option<Material>,
    shader: Option<Rc<Shader>>,
    input: Option<Rc<dyn InputBehavior>>,
    mobility: Mobility,
    marked_for_deletion: bool,
}

impl fmt::Debug for SceneObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mesh", &self.mesh.name)
            .field("mobility", &self.mobility)
            .field("marked_for_deletion", &self.marked_for_deletion)
            .finish_non_exhaustive()
    }
}

impl SceneObject {
    /// Unregistered object with an identity transform and no material or shader
    pub fn new(name: impl Into<String>, mesh: Rc<Mesh>) -> Self {
        Self {
            id: None,
            name: name.into(),
            mesh,
            transform: Transform::identity(),
            material: None,
            shader: None,
            input: None,
            mobility: Mobility::NonType,
            marked_for_deletion: false,
        }
    }

    /// Set the transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the material instance
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    /// Set the shader
    pub fn with_shader(mut self, shader: Rc<Shader>) -> Self {
        self.shader = Some(shader);
        self
    }

    /// Set the input behaviour
    pub fn with_input(mut self, input: Rc<dyn InputBehavior>) -> Self {
        self.input = Some(input);
        self
    }

    /// Set the mobility
    pub fn with_mobility(mut self, mobility: Mobility) -> Self {
        self.mobility = mobility;
        self
    }

    /// Id assigned at registration, `None` before
    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }

    /// Unique name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared geometry
    pub fn mesh(&self) -> &Rc<Mesh> {
        &self.mesh
    }

    /// Material instance
    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }

    /// Mutable material instance for editor tweaks
    pub fn material_mut(&mut self) -> Option<&mut Material> {
        self.material.as_mut()
    }

    /// Replace the material instance
    pub fn set_material(&mut self, material: Material) {
        self.material = Some(material);
    }

    /// Shader used to draw this object
    pub fn shader(&self) -> Option<&Rc<Shader>> {
        self.shader.as_ref()
    }

    /// Replace the shader
    pub fn set_shader(&mut self, shader: Rc<Shader>) {
        self.shader = Some(shader);
    }

    /// Input behaviour
    pub fn input(&self) -> Option<&Rc<dyn InputBehavior>> {
        self.input.as_ref()
    }

    /// Replace or clear the input behaviour
    pub fn set_input(&mut self, input: Option<Rc<dyn InputBehavior>>) {
        self.input = input;
    }

    /// Mobility class
    pub fn mobility(&self) -> Mobility {
        self.mobility
    }

    /// Flag the object for removal; only the registry may do this so it
    /// knows a sweep is due
    pub(crate) fn mark_for_deletion(&mut self) {
        self.marked_for_deletion = true;
    }

    /// Whether the object waits for the next sweep
    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion
    }
}
