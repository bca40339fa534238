//! # Scene Engine
//!
//! Scene object lifecycle and tiered lighting for a small forward-rendering
//! engine with an editor overlay.
//!
//! ## Features
//!
//! - **Slotted object registry**: stable ids and unique names, recycled
//!   through free lists, with two-phase (mark, then sweep) deletion
//! - **Light tiers**: unbounded static lights plus fixed-capacity stationary
//!   and dynamic tiers with dirty-flag compaction
//! - **Frame lifecycle**: cleanup, draw, light upload, overlay and present in
//!   a fixed order, so structural changes never race iteration
//! - **Headless by default**: GPU programs, textures and the window sit
//!   behind traits with recording implementations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         engine.setup_default_scene()?;
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, _engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
//!         Ok(())
//!     }
//!
//!     fn cleanup(&mut self, _engine: &mut Engine) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let mut compiler = RecordingCompiler::new(32);
//!     let mut engine = Engine::with_compiler(config, &mut compiler, Box::new(NullTextureBackend::new()))?;
//!     engine.run(&mut MyApp, &mut HeadlessBackend::with_frame_limit(60))?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{ApplicationConfig, AssetConfig, Config, EngineConfig, LightingConfig, SceneConfig},
        foundation::{
            collections::SlotAllocator,
            math::{Mat4, Transform, Vec3},
        },
        render::{
            Camera, HeadlessBackend, Light, LightData, LightKey, LightTier, LightTierManager, LightType,
            LightUploadMode, Material, Mesh, NullTextureBackend, RecordingCompiler, RenderBackend, Shader,
            UniformSink,
        },
        scene::{
            Mobility, ObjectHandle, ObjectId, Scene, SceneCommand, SceneObject, SceneObjectFactory,
            SceneObjectRegistry,
        },
        AppError, Application, Engine, EngineError,
    };
}
