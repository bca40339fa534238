//! Deferred creation requests from the editor overlay
//!
//! The overlay runs while the scene is being iterated, so it may not add
//! objects directly. Requests are queued and applied during the next
//! cleanup phase, after the sweep. Deletions do not go through the queue:
//! marking is already deferred by the registry.

use crate::foundation::math::Vec3;
use crate::render::assets::Assets;
use crate::render::lighting::LightType;
use crate::scene::factory::SceneObjectFactory;
use crate::scene::scene_object::Mobility;
use crate::scene::Scene;

/// One structural change requested by the UI
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneCommand {
    /// Add a cube
    CreateCube {
        /// World position
        position: Vec3,
    },
    /// Add a sphere
    CreateSphere {
        /// World position
        position: Vec3,
    },
    /// Add a light with its marker sphere
    CreateLight {
        /// Light type
        light_type: LightType,
        /// World position of the marker
        position: Vec3,
        /// Tier selector
        mobility: Mobility,
    },
}

/// FIFO of pending scene commands
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<SceneCommand>,
}

impl CommandQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request for the next cleanup
    pub fn push(&mut self, command: SceneCommand) {
        log::debug!("Queued {:?}", command);
        self.pending.push(command);
    }

    /// Pending requests
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Apply every pending request in order
    ///
    /// A request that fails (full light tier, name clash) is logged and
    /// dropped. Returns the number applied successfully.
    pub fn apply(&mut self, factory: &mut SceneObjectFactory, scene: &mut Scene, assets: &Assets) -> usize {
        let mut applied = 0;
        for command in self.pending.drain(..) {
            let result = match command {
                SceneCommand::CreateCube { position } => factory.create_cube_at(scene, assets, position).map(|_| ()),
                SceneCommand::CreateSphere { position } => factory.create_sphere_at(scene, assets, position).map(|_| ()),
                SceneCommand::CreateLight {
                    light_type,
                    position,
                    mobility,
                } => factory
                    .create_light_at(scene, assets, light_type, position, mobility)
                    .map(|_| ()),
            };
            match result {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("Dropped {:?}: {}", command, e),
            }
        }
        applied
    }
}
