//! Shader registry loaded from the shaders JSON config

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Deserialize;

use super::{RecordingProgram, Shader, ShaderError, ShaderKind, UniformSink};
use crate::core::config::AssetConfig;

/// Name under which the fallback shader is registered
pub const FALLBACK_SHADER_NAME: &str = "fallback";

/// Everything a compiler needs to build one program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRequest {
    /// Shader name from the config
    pub name: String,
    /// Variant the program will be wrapped in
    pub kind: ShaderKind,
    /// Vertex stage source file
    pub vertex_path: PathBuf,
    /// Fragment stage source file
    pub fragment_path: PathBuf,
}

/// Compiles and links GPU programs
pub trait ProgramCompiler {
    /// Build the program described by `request`
    fn compile(&mut self, request: &ProgramRequest) -> Result<Rc<dyn UniformSink>, ShaderError>;
}

/// Headless compiler producing [`RecordingProgram`]s
///
/// Basic programs get the forward-lit layout sized for `max_lights`, grid
/// programs the grid layout. Every compiled program stays reachable through
/// [`RecordingCompiler::program`] so tests can inspect uploads.
#[derive(Debug, Default)]
pub struct RecordingCompiler {
    max_lights: usize,
    programs: HashMap<String, Rc<RecordingProgram>>,
    failing: Vec<String>,
    missing_uniforms: Vec<String>,
}

impl RecordingCompiler {
    /// Compiler whose basic programs declare `max_lights` light entries
    pub fn new(max_lights: usize) -> Self {
        Self {
            max_lights,
            ..Self::default()
        }
    }

    /// Make compilation of `name` fail
    pub fn fail_on(mut self, name: impl Into<String>) -> Self {
        self.failing.push(name.into());
        self
    }

    /// Leave `uniform` out of every program built from now on
    pub fn without_uniform(mut self, uniform: impl Into<String>) -> Self {
        self.missing_uniforms.push(uniform.into());
        self
    }

    /// Program compiled for shader `name`
    pub fn program(&self, name: &str) -> Option<Rc<RecordingProgram>> {
        self.programs.get(name).cloned()
    }
}

impl ProgramCompiler for RecordingCompiler {
    fn compile(&mut self, request: &ProgramRequest) -> Result<Rc<dyn UniformSink>, ShaderError> {
        if self.failing.contains(&request.name) {
            return Err(ShaderError::Compile {
                name: request.name.clone(),
                reason: "compilation disabled for this shader".to_string(),
            });
        }

        let mut program = match request.kind {
            ShaderKind::Basic => RecordingProgram::forward_lit(self.max_lights),
            ShaderKind::Grid => RecordingProgram::grid(),
        };
        for uniform in &self.missing_uniforms {
            program = program.without(uniform);
        }

        let program = Rc::new(program);
        self.programs.insert(request.name.clone(), Rc::clone(&program));
        Ok(program)
    }
}

#[derive(Debug, Deserialize)]
struct ShadersDocument {
    shaders: Vec<ShaderEntry>,
}

#[derive(Debug, Deserialize)]
struct ShaderEntry {
    #[serde(default = "unnamed")]
    name: String,
    #[serde(default, rename = "type")]
    type_name: String,
    stages: Option<ShaderStages>,
    #[serde(default)]
    helper: bool,
}

#[derive(Debug, Deserialize)]
struct ShaderStages {
    vertex: String,
    fragment: String,
}

fn unnamed() -> String {
    "unnamed".to_string()
}

/// Named shaders plus the helper program used for gizmos and light markers
#[derive(Debug, Default)]
pub struct ShaderManager {
    shaders: HashMap<String, Rc<Shader>>,
    helper: Option<Rc<Shader>>,
}

impl ShaderManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the shaders config named by `assets`, falling back to the
    /// built-in fallback shader when the config cannot be used
    ///
    /// Only fails when even the fallback shader cannot be built.
    pub fn load_or_fallback(&mut self, assets: &AssetConfig, compiler: &mut dyn ProgramCompiler) -> Result<(), ShaderError> {
        let loaded = std::fs::read_to_string(&assets.shaders_path)
            .map_err(ShaderError::from)
            .and_then(|json| self.load_str(&json, Path::new(&assets.shaders_dir), compiler));

        match loaded {
            Ok(count) => {
                log::info!("Loaded {} shaders from {}", count, assets.shaders_path);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load shader config, using fallback: {}", e);
                self.create_fallback(assets, compiler)
            }
        }
    }

    /// Build every entry of a shaders document
    ///
    /// Individual entries that fail are logged and skipped. A malformed
    /// document is an error. Returns the number of shaders added.
    pub fn load_str(&mut self, json: &str, shaders_dir: &Path, compiler: &mut dyn ProgramCompiler) -> Result<usize, ShaderError> {
        let document: ShadersDocument = serde_json::from_str(json)?;
        let mut added = 0;

        for entry in document.shaders {
            match self.load_entry(&entry, shaders_dir, compiler) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => log::error!("Failed to load shader {}: {}", entry.name, e),
            }
        }

        Ok(added)
    }

    fn load_entry(&mut self, entry: &ShaderEntry, shaders_dir: &Path, compiler: &mut dyn ProgramCompiler) -> Result<bool, ShaderError> {
        let stages = entry
            .stages
            .as_ref()
            .ok_or_else(|| ShaderError::MissingStages(entry.name.clone()))?;

        if self.shaders.contains_key(&entry.name) {
            log::info!("Shader '{}' already exists, skipping", entry.name);
            return Ok(false);
        }

        let request = ProgramRequest {
            name: entry.name.clone(),
            kind: ShaderKind::from_config_type(&entry.type_name),
            vertex_path: shaders_dir.join(&stages.vertex),
            fragment_path: shaders_dir.join(&stages.fragment),
        };
        let program = compiler.compile(&request)?;
        let shader = Rc::new(Shader::new(&request.name, request.kind, program));

        if entry.helper {
            log::info!("Set helper shader: {}", entry.name);
            self.helper = Some(Rc::clone(&shader));
        }

        Ok(self.add(shader))
    }

    /// Build the hardcoded fallback shader and make it the helper
    pub fn create_fallback(&mut self, assets: &AssetConfig, compiler: &mut dyn ProgramCompiler) -> Result<(), ShaderError> {
        let request = ProgramRequest {
            name: FALLBACK_SHADER_NAME.to_string(),
            kind: ShaderKind::Basic,
            vertex_path: PathBuf::from(&assets.fallback_vertex),
            fragment_path: PathBuf::from(&assets.fallback_fragment),
        };
        log::info!(
            "Attempting fallback shader at {} / {}",
            request.vertex_path.display(),
            request.fragment_path.display()
        );

        let program = compiler.compile(&request).map_err(|e| {
            log::error!("Failed to create fallback shader: {}", e);
            e
        })?;
        let shader = Rc::new(Shader::new(FALLBACK_SHADER_NAME, ShaderKind::Basic, program));
        self.helper = Some(Rc::clone(&shader));
        self.add(shader);
        Ok(())
    }

    /// Register a shader unless its name is taken
    pub fn add(&mut self, shader: Rc<Shader>) -> bool {
        let name = shader.name().to_string();
        if self.shaders.contains_key(&name) {
            log::info!("Shader '{}' already exists, skipping", name);
            return false;
        }
        self.shaders.insert(name.clone(), shader);
        log::info!("Shader '{}' added", name);
        true
    }

    /// Shader by name
    pub fn get(&self, name: &str) -> Option<Rc<Shader>> {
        self.shaders.get(name).cloned()
    }

    /// Shader by name, or the fallback shader with a logged error
    pub fn get_or_fallback(&self, name: &str) -> Option<Rc<Shader>> {
        if let Some(shader) = self.get(name) {
            return Some(shader);
        }
        log::error!("Shader '{}' not found, using fallback", name);
        self.get(FALLBACK_SHADER_NAME)
    }

    /// Helper program, if one was flagged in the config
    pub fn helper(&self) -> Option<Rc<Shader>> {
        self.helper.clone()
    }

    /// Registered shader names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.shaders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of shaders
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    /// Whether no shader is registered
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADERS: &str = r#"{
        "shaders": [
            { "name": "basic", "type": "GLSL",
              "stages": { "vertex": "basic.vert", "fragment": "basic.frag" } },
            { "name": "grid", "type": "grid",
              "stages": { "vertex": "grid.vert", "fragment": "grid.frag" } },
            { "name": "light", "type": "GLSL", "helper": true,
              "stages": { "vertex": "light.vert", "fragment": "light.frag" } },
            { "name": "basic", "type": "grid",
              "stages": { "vertex": "x.vert", "fragment": "x.frag" } },
            { "name": "nostages", "type": "GLSL" }
        ]
    }"#;

    #[test]
    fn test_load_builds_variants_and_skips_duplicates() {
        let mut compiler = RecordingCompiler::new(4);
        let mut shaders = ShaderManager::new();
        let added = shaders.load_str(SHADERS, Path::new("shaders"), &mut compiler).unwrap();

        assert_eq!(added, 3);
        assert_eq!(shaders.names(), vec!["basic", "grid", "light"]);
        assert_eq!(shaders.get("basic").unwrap().kind(), ShaderKind::Basic);
        assert_eq!(shaders.get("grid").unwrap().kind(), ShaderKind::Grid);
        assert_eq!(shaders.helper().unwrap().name(), "light");
    }

    #[test]
    fn test_failed_compile_is_skipped() {
        let mut compiler = RecordingCompiler::new(4).fail_on("grid");
        let mut shaders = ShaderManager::new();
        let added = shaders.load_str(SHADERS, Path::new("shaders"), &mut compiler).unwrap();
        assert_eq!(added, 2);
        assert!(shaders.get("grid").is_none());
    }

    #[test]
    fn test_missing_config_uses_fallback() {
        let assets = AssetConfig {
            shaders_path: "does/not/exist/shaders.json".to_string(),
            ..AssetConfig::default()
        };
        let mut compiler = RecordingCompiler::new(4);
        let mut shaders = ShaderManager::new();
        shaders.load_or_fallback(&assets, &mut compiler).unwrap();

        assert_eq!(shaders.names(), vec![FALLBACK_SHADER_NAME]);
        assert_eq!(shaders.get_or_fallback("basic").unwrap().name(), FALLBACK_SHADER_NAME);
        assert!(shaders.helper().is_some());
    }

    #[test]
    fn test_fallback_failure_propagates() {
        let assets = AssetConfig {
            shaders_path: "does/not/exist/shaders.json".to_string(),
            ..AssetConfig::default()
        };
        let mut compiler = RecordingCompiler::new(4).fail_on(FALLBACK_SHADER_NAME);
        let mut shaders = ShaderManager::new();
        assert!(shaders.load_or_fallback(&assets, &mut compiler).is_err());
        assert!(shaders.is_empty());
    }

    #[test]
    fn test_stage_paths_resolve_against_shaders_dir() {
        struct PathCapture(Vec<ProgramRequest>);
        impl ProgramCompiler for PathCapture {
            fn compile(&mut self, request: &ProgramRequest) -> Result<Rc<dyn UniformSink>, ShaderError> {
                self.0.push(request.clone());
                Ok(Rc::new(RecordingProgram::accept_all()))
            }
        }

        let mut compiler = PathCapture(Vec::new());
        let mut shaders = ShaderManager::new();
        shaders.load_str(SHADERS, Path::new("res/shaders"), &mut compiler).unwrap();
        assert_eq!(compiler.0[0].vertex_path, Path::new("res/shaders").join("basic.vert"));
    }
}
