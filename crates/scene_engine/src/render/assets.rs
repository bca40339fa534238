//! Shared render assets: shaders, material prototypes and textures

use crate::core::config::AssetConfig;
use crate::render::material::MaterialLibrary;
use crate::render::shader::{ProgramCompiler, ShaderError, ShaderManager};
use crate::render::texture::{TextureBackend, TextureManager};

/// Everything a scene object borrows from to draw
#[derive(Debug)]
pub struct Assets {
    /// Shader registry
    pub shaders: ShaderManager,
    /// Material prototypes
    pub materials: MaterialLibrary,
    /// Loaded textures
    pub textures: TextureManager,
}

impl Assets {
    /// Empty asset set over a headless texture backend
    pub fn headless() -> Self {
        Self {
            shaders: ShaderManager::new(),
            materials: MaterialLibrary::new(),
            textures: TextureManager::headless(),
        }
    }

    /// Load shaders, textures and materials as configured
    ///
    /// A missing or malformed materials document leaves the library empty
    /// (objects fall back to the default material). A broken shaders document
    /// falls back to the built-in shader; only a failure of that fallback is
    /// returned.
    pub fn load(
        config: &AssetConfig,
        compiler: &mut dyn ProgramCompiler,
        texture_backend: Box<dyn TextureBackend>,
    ) -> Result<Self, ShaderError> {
        let mut shaders = ShaderManager::new();
        shaders.load_or_fallback(config, compiler)?;

        let mut textures = TextureManager::new(texture_backend, &config.assets_dir);
        let mut materials = MaterialLibrary::new();
        if let Err(e) = materials.load_file(&config.materials_path, &mut textures) {
            log::error!("Failed to load materials from {}: {}", config.materials_path, e);
        }

        Ok(Self {
            shaders,
            materials,
            textures,
        })
    }
}
