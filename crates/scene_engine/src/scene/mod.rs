//! Scene management
//!
//! ## Architecture
//!
//! ```text
//! SceneObjectFactory ──creates──> SceneObjectRegistry (owns objects)
//!         │                               ▲
//!         └──adds──> LightTierManager ────┘ (lights follow their marker
//!                                            objects through handles)
//! ```
//!
//! The [`Scene`] bundles the registry with the light tiers so the frame
//! driver can keep them in step: sweeping objects dirties every light tier
//! and compacts it right away, so lights whose marker is gone free their
//! slots before any creation queued for the same cleanup runs.

pub mod commands;
pub mod factory;
pub mod input;
pub mod registry;
pub mod scene_object;

#[cfg(test)]
mod tests;

pub use commands::{CommandQueue, SceneCommand};
pub use factory::{FactoryError, LightHandles, NameGenerator, SceneObjectFactory};
pub use input::{InputBehavior, InputContext, OrbitBehavior, SpinBehavior};
pub use registry::{RegistryError, SceneObjectRegistry};
pub use scene_object::{Mobility, ObjectHandle, ObjectId, SceneObject};

use crate::core::config::LightingConfig;
use crate::render::lighting::LightTierManager;

/// Scene objects and the lights attached to them
#[derive(Debug, Default)]
pub struct Scene {
    /// Object storage
    pub objects: SceneObjectRegistry,
    /// Light tiers
    pub lights: LightTierManager,
}

impl Scene {
    /// Empty scene with the configured light capacities
    pub fn new(lighting: &LightingConfig) -> Self {
        Self {
            objects: SceneObjectRegistry::new(),
            lights: LightTierManager::new(lighting),
        }
    }

    /// Flag an object for removal at the next cleanup
    ///
    /// Lights whose marker is flagged are reclaimed by the compaction that
    /// follows the sweep.
    pub fn delete_object(&mut self, name: &str) -> bool {
        self.objects.mark_for_deletion(name)
    }

    /// Remove flagged objects, then compact every dirty light tier
    ///
    /// Returns the number of objects removed.
    pub fn sweep(&mut self) -> usize {
        let removed = self.objects.sweep();
        if removed > 0 {
            self.lights.mark_all_dirty();
        }
        self.lights.compact_dirty(&self.objects);
        removed
    }
}
