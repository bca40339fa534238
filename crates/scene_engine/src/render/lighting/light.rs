//! Light payloads and their link to a visual scene object

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{utils, Vec3};
use crate::scene::registry::SceneObjectRegistry;
use crate::scene::scene_object::{Mobility, ObjectHandle};

/// Light type, with the integer the shader's `lights[i].type` expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum LightType {
    /// Omnidirectional, no direction
    Point = 0,
    /// Parallel rays from the visual object toward the origin
    Directional = 1,
    /// Cone along the visual object's forward axis
    Spot = 2,
}

impl LightType {
    /// Value written to the `type` uniform
    pub fn shader_value(self) -> i32 {
        self as i32
    }

    /// Lowercase name used for generated object names
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Directional => "directional",
            Self::Spot => "spot",
        }
    }
}

impl fmt::Display for LightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a light inside a [`LightTierManager`](super::LightTierManager)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightKey(pub u64);

/// Values uploaded for one `lights[i]` entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightData {
    /// World position
    pub position: Vec3,
    /// Unit direction (unused by point lights)
    pub direction: Vec3,
    /// Ambient colour
    pub ambient: Vec3,
    /// Diffuse colour
    pub diffuse: Vec3,
    /// Specular colour
    pub specular: Vec3,
    /// Constant attenuation term
    pub constant: f32,
    /// Linear attenuation term
    pub linear: f32,
    /// Quadratic attenuation term
    pub quadratic: f32,
    /// Cosine of the inner spot angle
    pub cut_off: f32,
    /// Cosine of the outer spot angle
    pub outer_cut_off: f32,
}

impl Default for LightData {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            direction: Vec3::new(0.0, -1.0, 0.0),
            ambient: Vec3::repeat(0.1),
            diffuse: Vec3::repeat(0.3),
            specular: Vec3::repeat(0.8),
            constant: 1.0,
            linear: 0.014,
            quadratic: 0.0007,
            cut_off: utils::deg_to_rad(12.5).cos(),
            outer_cut_off: utils::deg_to_rad(17.5).cos(),
        }
    }
}

impl LightData {
    /// Default payload placed at `position`, aimed at the origin
    pub fn at(position: Vec3) -> Self {
        let mut data = Self {
            position,
            ..Self::default()
        };
        if let Some(direction) = (-position).try_normalize(f32::EPSILON) {
            data.direction = direction;
        }
        data
    }
}

/// Light registered with the tier manager
///
/// A light with a visual object takes its position and direction from that
/// object's transform on every upload. The handle is non-owning: once the
/// object is swept the handle stops resolving and the light expires.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    key: Option<LightKey>,
    light_type: LightType,
    mobility: Mobility,
    /// Uploaded values
    pub data: LightData,
    visual: Option<ObjectHandle>,
    removal_requested: bool,
}

impl Light {
    /// Standalone light with default payload
    pub fn new(light_type: LightType, data: LightData) -> Self {
        Self {
            key: None,
            light_type,
            mobility: Mobility::Static,
            data,
            visual: None,
            removal_requested: false,
        }
    }

    /// Attach the visual object this light follows
    pub fn with_visual(mut self, visual: ObjectHandle) -> Self {
        self.visual = Some(visual);
        self
    }

    /// Key assigned when the light was added to a manager
    pub fn key(&self) -> Option<LightKey> {
        self.key
    }

    pub(crate) fn assign(&mut self, key: LightKey, mobility: Mobility) {
        self.key = Some(key);
        self.mobility = mobility;
    }

    /// Light type
    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    /// Mobility of the tier holding this light
    pub fn mobility(&self) -> Mobility {
        self.mobility
    }

    /// Visual object handle
    pub fn visual(&self) -> Option<ObjectHandle> {
        self.visual
    }

    /// Whether removal was requested
    pub fn is_removal_requested(&self) -> bool {
        self.removal_requested
    }

    pub(crate) fn request_removal(&mut self) {
        self.removal_requested = true;
    }

    /// Whether compaction should reclaim this light
    ///
    /// True after an explicit removal, or once the visual object is flagged
    /// for deletion or already swept.
    pub fn is_expired(&self, registry: &SceneObjectRegistry) -> bool {
        if self.removal_requested {
            return true;
        }
        self.visual.is_some_and(|handle| {
            registry
                .get(handle)
                .map_or(true, |object| object.is_marked_for_deletion())
        })
    }

    /// Re-derive position and direction from the visual object
    ///
    /// Returns `false` when the visual object no longer resolves; the payload
    /// is left untouched in that case. Standalone lights always succeed.
    pub fn refresh(&mut self, registry: &SceneObjectRegistry) -> bool {
        let Some(handle) = self.visual else {
            return true;
        };
        let Some(object) = registry.get(handle) else {
            return false;
        };

        let transform = &object.transform;
        self.data.position = transform.position();

        match self.light_type {
            LightType::Directional => {
                if let Some(direction) = (-self.data.position).try_normalize(f32::EPSILON) {
                    self.data.direction = direction;
                }
            }
            LightType::Spot => {
                if let Some(forward) = transform.forward() {
                    self.data.direction = forward;
                }
            }
            LightType::Point => {}
        }
        true
    }
}
