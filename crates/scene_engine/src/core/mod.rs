//! # Core Engine Module
//!
//! Shared abstractions the other subsystems depend on. Currently this is the
//! unified configuration system.

pub mod config;

// Re-export commonly used config types
pub use config::{ApplicationConfig, AssetConfig, Config, ConfigError, EngineConfig, LightingConfig, SceneConfig};
