//! # Rendering
//!
//! Forward-rendering resources and the frame driver's collaborators.
//!
//! ## Architecture
//!
//! - **Shaders**: [`ShaderManager`] builds [`Shader`] variants (basic, grid)
//!   on top of compiled programs exposed through [`UniformSink`]
//! - **Materials and textures**: JSON material library, texture registry
//!   over a [`TextureBackend`]
//! - **Lighting**: [`LightTierManager`] keeps static, stationary and dynamic
//!   lights and uploads them as a `lights[]` uniform array
//! - **Frame**: [`FrameLifecycle`] phases and the [`RenderBackend`] seam
//!
//! Nothing in here talks to a GPU directly. Program compilation, uniform
//! writes, texture uploads and draw calls all go through traits so the
//! engine runs headless in tests.

pub mod assets;
pub mod camera;
pub mod frame;
pub mod lighting;
pub mod material;
pub mod mesh;
pub mod shader;
pub mod texture;

pub use assets::Assets;
pub use camera::Camera;
pub use frame::{FrameError, FrameLifecycle, FramePhase, FrameStats, HeadlessBackend, LightUploadMode, RenderBackend};
pub use lighting::{Light, LightData, LightError, LightKey, LightTier, LightTierManager, LightType, UploadReport};
pub use material::{Material, MaterialError, MaterialLibrary, DEFAULT_MATERIAL_NAME};
pub use mesh::{Mesh, MeshLibrary, Vertex};
pub use shader::{
    ProgramCompiler, ProgramRequest, RecordingCompiler, RecordingProgram, Shader, ShaderError, ShaderKind,
    ShaderManager, UniformSink, UniformValue,
};
pub use texture::{NullTextureBackend, Texture, TextureBackend, TextureError, TextureHandle, TextureManager};
