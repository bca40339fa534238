//! Shader variants and the shader registry
//!
//! A [`Shader`] pairs a compiled program with the variant that knows which
//! uniforms it expects. Every variant exposes the same three capabilities
//! (`bind`, `set_material`, `set_matrices`); the grid variant simply has no
//! use for materials.

mod manager;
mod uniforms;

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use manager::{ProgramCompiler, ProgramRequest, RecordingCompiler, ShaderManager, FALLBACK_SHADER_NAME};
pub use uniforms::{try_set, RecordingProgram, UniformSink, UniformValue, LIGHT_FIELDS};

use crate::foundation::math::Mat4;
use crate::render::camera::Camera;
use crate::render::material::Material;
use crate::render::texture::TextureManager;

/// Shader loading errors
#[derive(Error, Debug)]
pub enum ShaderError {
    /// Config or stage file could not be read
    #[error("failed to read shader file: {0}")]
    Io(#[from] std::io::Error),

    /// Shaders document is malformed
    #[error("invalid shader config: {0}")]
    Config(#[from] serde_json::Error),

    /// Entry has no `stages` object
    #[error("shader '{0}' has no stages")]
    MissingStages(String),

    /// Program failed to compile or link
    #[error("shader '{name}' failed to compile: {reason}")]
    Compile {
        /// Shader name
        name: String,
        /// Compiler log
        reason: String,
    },
}

/// Shader variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ShaderKind {
    /// Forward-lit Phong shader
    #[default]
    Basic,
    /// Editor ground grid
    Grid,
}

impl ShaderKind {
    /// Variant for a config `type` string: `"grid"` selects the grid shader
    pub fn from_config_type(type_name: &str) -> Self {
        if type_name == "grid" {
            Self::Grid
        } else {
            Self::Basic
        }
    }
}

/// Compiled program plus the variant driving its uniforms
pub struct Shader {
    name: String,
    kind: ShaderKind,
    program: Rc<dyn UniformSink>,
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Shader {
    /// Wrap a compiled program
    pub fn new(name: impl Into<String>, kind: ShaderKind, program: Rc<dyn UniformSink>) -> Self {
        Self {
            name: name.into(),
            kind,
            program,
        }
    }

    /// Registry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant
    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    /// Underlying program for direct uniform writes
    pub fn program(&self) -> &dyn UniformSink {
        self.program.as_ref()
    }

    /// Make the program current
    pub fn bind(&self) {
        self.program.bind();
    }

    /// Upload material colours and bind its textures
    ///
    /// Returns the number of uniforms that were missing from the program.
    pub fn set_material(&self, material: &Material, textures: &TextureManager) -> usize {
        match self.kind {
            ShaderKind::Basic => self.set_basic_material(material, textures),
            ShaderKind::Grid => 0,
        }
    }

    fn set_basic_material(&self, material: &Material, textures: &TextureManager) -> usize {
        let program = self.program();
        let mut missing = 0;
        let mut write = |name: &str, value: UniformValue| {
            if !try_set(program, name, value) {
                missing += 1;
            }
        };

        write("material.ambient", UniformValue::Vec3(material.ambient));
        write("material.diffuse", UniformValue::Vec3(material.diffuse));
        write("material.specular", UniformValue::Vec3(material.specular));
        write("material.shininess", UniformValue::Float(material.shininess));

        let texture_slots = [
            (material.diffuse_texture, 0, "material_diffuseTex", "hasDiffuseTex"),
            (material.specular_texture, 1, "material_specularTex", "hasSpecularTex"),
        ];
        for (texture, slot, sampler, flag) in texture_slots {
            let bound = texture.is_some_and(|handle| textures.bind(handle, slot));
            if bound {
                write(sampler, UniformValue::Int(slot as i32));
            }
            write(flag, UniformValue::Int(i32::from(bound)));
        }

        missing
    }

    /// Upload model, view and projection matrices plus the eye position
    ///
    /// Returns the number of uniforms that were missing from the program.
    pub fn set_matrices(&self, model: &Mat4, camera: &Camera) -> usize {
        let program = self.program();
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();

        let writes: Vec<(&str, UniformValue)> = match self.kind {
            ShaderKind::Basic => vec![
                ("model", UniformValue::Mat4(*model)),
                ("view", UniformValue::Mat4(view)),
                ("projection", UniformValue::Mat4(projection)),
                ("viewPos", UniformValue::Vec3(camera.position)),
            ],
            ShaderKind::Grid => vec![
                ("u_view", UniformValue::Mat4(view)),
                ("u_projection", UniformValue::Mat4(projection)),
            ],
        };

        writes
            .into_iter()
            .filter(|(name, value)| !try_set(program, name, *value))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    fn basic_with(program: &Rc<RecordingProgram>) -> Shader {
        Shader::new("basic", ShaderKind::Basic, Rc::clone(program) as Rc<dyn UniformSink>)
    }

    #[test]
    fn test_kind_from_config_type() {
        assert_eq!(ShaderKind::from_config_type("grid"), ShaderKind::Grid);
        assert_eq!(ShaderKind::from_config_type("GLSL"), ShaderKind::Basic);
        assert_eq!(ShaderKind::from_config_type(""), ShaderKind::Basic);
    }

    #[test]
    fn test_basic_material_without_textures() {
        let program = Rc::new(RecordingProgram::forward_lit(1));
        let shader = basic_with(&program);
        let textures = TextureManager::headless();

        let missing = shader.set_material(&Material::default(), &textures);
        assert_eq!(missing, 0);
        assert_eq!(program.value("material.shininess"), Some(UniformValue::Float(8.0)));
        assert_eq!(program.value("hasDiffuseTex"), Some(UniformValue::Int(0)));
        assert_eq!(program.value("hasSpecularTex"), Some(UniformValue::Int(0)));
        assert!(!program.was_written("material_diffuseTex"));
    }

    #[test]
    fn test_basic_material_binds_textures_to_slots() {
        let program = Rc::new(RecordingProgram::forward_lit(1));
        let shader = basic_with(&program);
        let mut textures = TextureManager::headless();

        let mut material = Material::default();
        material.diffuse_texture = Some(textures.load("d.png").unwrap());
        shader.set_material(&material, &textures);

        assert_eq!(program.value("hasDiffuseTex"), Some(UniformValue::Int(1)));
        assert_eq!(program.value("material_diffuseTex"), Some(UniformValue::Int(0)));
        assert_eq!(program.value("hasSpecularTex"), Some(UniformValue::Int(0)));
    }

    #[test]
    fn test_grid_writes_only_view_projection() {
        let program = Rc::new(RecordingProgram::grid());
        let shader = Shader::new("grid", ShaderKind::Grid, Rc::clone(&program) as Rc<dyn UniformSink>);
        let camera = Camera::default();

        assert_eq!(shader.set_material(&Material::default(), &TextureManager::headless()), 0);
        assert_eq!(shader.set_matrices(&Mat4::identity(), &camera), 0);
        assert!(program.was_written("u_view"));
        assert!(program.was_written("u_projection"));
        assert_eq!(program.write_count(), 2);
    }

    #[test]
    fn test_basic_matrices_report_missing() {
        let program = Rc::new(RecordingProgram::forward_lit(0).without("viewPos"));
        let shader = basic_with(&program);
        let mut camera = Camera::default();
        camera.set_position(Vec3::new(1.0, 2.0, 3.0));

        assert_eq!(shader.set_matrices(&Mat4::identity(), &camera), 1);
        assert_eq!(program.value("model"), Some(UniformValue::Mat4(Mat4::identity())));
    }
}
