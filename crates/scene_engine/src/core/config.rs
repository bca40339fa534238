//! # Unified Configuration System
//!
//! All configuration structures in one place. Every struct is serde-ready,
//! has sensible defaults and can be loaded from TOML or RON through the
//! [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging, debug features, frame pacing
//! - **Lighting Config**: light tier capacities and global ambient
//! - **Scene Config**: light upload policy and default shader
//! - **Asset Config**: material/shader documents and asset directories

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::render::frame::LightUploadMode;

pub use crate::config::{Config, ConfigError};

/// # Engine Configuration
///
/// Core engine behavior configuration including logging and debug features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Verify registry consistency after every cleanup
    pub debug_mode: bool,
    /// Target FPS for frame rate limiting
    pub target_fps: Option<u32>,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
            target_fps: None,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable debug mode
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Set target FPS
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = Some(fps);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Lighting Configuration
///
/// Capacities of the bounded light tiers. The static tier is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Slots in the stationary tier
    pub stationary_capacity: u32,
    /// Slots in the dynamic tier
    pub dynamic_capacity: u32,
    /// Scene-wide ambient term written as `globalAmbient`
    pub global_ambient: [f32; 3],
}

impl LightingConfig {
    /// Default stationary tier capacity
    pub const DEFAULT_STATIONARY_CAPACITY: u32 = 24;
    /// Default dynamic tier capacity
    pub const DEFAULT_DYNAMIC_CAPACITY: u32 = 8;

    /// Set both bounded tier capacities
    pub fn with_capacities(mut self, stationary: u32, dynamic: u32) -> Self {
        self.stationary_capacity = stationary;
        self.dynamic_capacity = dynamic;
        self
    }

    /// Global ambient as a vector
    pub fn global_ambient(&self) -> Vec3 {
        Vec3::from(self.global_ambient)
    }

    /// Reject empty tiers
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stationary_capacity == 0 {
            return Err(ConfigError::Invalid("stationary light capacity must be at least 1".to_string()));
        }
        if self.dynamic_capacity == 0 {
            return Err(ConfigError::Invalid("dynamic light capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            stationary_capacity: Self::DEFAULT_STATIONARY_CAPACITY,
            dynamic_capacity: Self::DEFAULT_DYNAMIC_CAPACITY,
            global_ambient: [0.1, 0.1, 0.1],
        }
    }
}

/// # Scene Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Upload lights once per drawn object or once per frame
    pub light_upload_mode: LightUploadMode,
    /// Shader assigned to factory-made objects
    pub default_shader: String,
    /// Grid-variant shader drawn under the scene each frame; `None` disables the grid
    pub grid_shader: Option<String>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            light_upload_mode: LightUploadMode::PerObject,
            default_shader: "basic".to_string(),
            grid_shader: Some("grid".to_string()),
        }
    }
}

/// # Asset Configuration
///
/// Locations of the material/shader documents and the directories their
/// relative file names resolve against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Base directory for textures
    pub assets_dir: String,
    /// Materials JSON document
    pub materials_path: String,
    /// Shaders JSON document
    pub shaders_path: String,
    /// Directory the shader stage paths resolve against
    pub shaders_dir: String,
    /// Vertex stage of the fallback shader
    pub fallback_vertex: String,
    /// Fragment stage of the fallback shader
    pub fallback_fragment: String,
}

impl AssetConfig {
    /// Create a new asset configuration
    pub fn new() -> Self {
        Self {
            assets_dir: "assets".to_string(),
            materials_path: "config/materials.json".to_string(),
            shaders_path: "config/shaders.json".to_string(),
            shaders_dir: "shaders".to_string(),
            fallback_vertex: "shaders/opengl/basic.vert".to_string(),
            fallback_fragment: "shaders/opengl/basic.frag".to_string(),
        }
    }

    /// Set assets directory
    pub fn with_assets_dir(mut self, dir: impl Into<String>) -> Self {
        self.assets_dir = dir.into();
        self
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Light tier configuration
    pub lighting: LightingConfig,
    /// Scene behaviour
    pub scene: SceneConfig,
    /// Asset locations
    pub assets: AssetConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lighting.validate()?;
        if self.scene.default_shader.is_empty() {
            return Err(ConfigError::Invalid("default shader name cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tier_sizes() {
        let config = ApplicationConfig::default();
        assert_eq!(config.lighting.stationary_capacity, 24);
        assert_eq!(config.lighting.dynamic_capacity, 8);
        assert_eq!(config.scene.default_shader, "basic");
        assert_eq!(config.scene.grid_shader.as_deref(), Some("grid"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ApplicationConfig::from_toml_str(
            r#"
            [lighting]
            dynamic_capacity = 4

            [scene]
            light_upload_mode = "Batched"
            "#,
        )
        .unwrap();

        assert_eq!(config.lighting.dynamic_capacity, 4);
        assert_eq!(config.lighting.stationary_capacity, 24);
        assert_eq!(config.scene.light_upload_mode, LightUploadMode::Batched);
        assert_eq!(config.assets, AssetConfig::default());
    }

    #[test]
    fn test_ron_config() {
        let config = ApplicationConfig::from_ron_str("(lighting: (stationary_capacity: 2, dynamic_capacity: 1))").unwrap();
        assert_eq!(config.lighting.stationary_capacity, 2);
        assert_eq!(config.lighting.dynamic_capacity, 1);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = ApplicationConfig {
            lighting: LightingConfig::default().with_capacities(0, 8),
            ..ApplicationConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            ApplicationConfig::load_from_file("settings.yaml"),
            Err(ConfigError::Io(_) | ConfigError::UnsupportedFormat(_))
        ));
    }
}
