//! Uniform upload interface
//!
//! [`UniformSink`] is the narrow contract between the scene/lighting code and
//! a compiled GPU program. Writers must check `has_uniform` before writing;
//! [`try_set`] does that and logs a warning on a miss so one missing uniform
//! never aborts an upload.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::foundation::math::{Mat4, Vec3};

/// Program that accepts named uniform writes
///
/// Methods take `&self`: a program is shared between every object that draws
/// with it, and binding/writing uniforms does not change its identity.
pub trait UniformSink {
    /// Make this program current
    fn bind(&self);

    /// Whether the linked program declares `name`
    fn has_uniform(&self, name: &str) -> bool;

    /// Write a `vec3`
    fn set_vec3(&self, name: &str, value: Vec3);

    /// Write a `float`
    fn set_float(&self, name: &str, value: f32);

    /// Write an `int` (also used for samplers and booleans)
    fn set_int(&self, name: &str, value: i32);

    /// Write a `uint`
    fn set_uint(&self, name: &str, value: u32);

    /// Write a `mat4`
    fn set_mat4(&self, name: &str, value: &Mat4);
}

/// Value of a single uniform write
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `vec3`
    Vec3(Vec3),
    /// `float`
    Float(f32),
    /// `int`
    Int(i32),
    /// `uint`
    Uint(u32),
    /// `mat4`
    Mat4(Mat4),
}

/// Write `value` to `name` if the program declares it
///
/// Returns `false` and logs a warning when the uniform is missing.
pub fn try_set(sink: &dyn UniformSink, name: &str, value: UniformValue) -> bool {
    if !sink.has_uniform(name) {
        log::warn!("Uniform '{}' not found in shader program", name);
        return false;
    }

    match value {
        UniformValue::Vec3(v) => sink.set_vec3(name, v),
        UniformValue::Float(v) => sink.set_float(name, v),
        UniformValue::Int(v) => sink.set_int(name, v),
        UniformValue::Uint(v) => sink.set_uint(name, v),
        UniformValue::Mat4(v) => sink.set_mat4(name, &v),
    }
    true
}

/// Light struct fields written per `lights[i]` entry
pub const LIGHT_FIELDS: [&str; 10] = [
    "position",
    "direction",
    "diffuse",
    "specular",
    "constant",
    "linear",
    "quadratic",
    "cutOff",
    "outerCutOff",
    "type",
];

/// In-memory program that records every write
///
/// Stands in for a GPU program in tests and headless runs. The declared
/// uniform set decides what `has_uniform` reports; writes to undeclared names
/// are dropped, like a GL driver ignoring location -1.
#[derive(Debug, Default)]
pub struct RecordingProgram {
    /// `None` declares every name
    declared: Option<HashSet<String>>,
    removed: HashSet<String>,
    values: RefCell<HashMap<String, UniformValue>>,
    write_count: Cell<usize>,
    bind_count: Cell<usize>,
}

impl RecordingProgram {
    /// Program that declares every uniform name
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Program declaring exactly the given names
    pub fn with_uniforms<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declared: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Program with the uniform layout of the basic forward-lit shader
    pub fn forward_lit(max_lights: usize) -> Self {
        let mut names: Vec<String> = [
            "material.ambient",
            "material.diffuse",
            "material.specular",
            "material.shininess",
            "material_diffuseTex",
            "material_specularTex",
            "hasDiffuseTex",
            "hasSpecularTex",
            "model",
            "view",
            "projection",
            "viewPos",
            "globalAmbient",
            "activeLightCount",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        for i in 0..max_lights {
            names.extend(LIGHT_FIELDS.iter().map(|field| format!("lights[{i}].{field}")));
        }
        Self::with_uniforms(names)
    }

    /// Program with the uniform layout of the grid shader
    pub fn grid() -> Self {
        Self::with_uniforms(["u_view", "u_projection"])
    }

    /// Drop a name from the declared set
    pub fn without(mut self, name: &str) -> Self {
        self.removed.insert(name.to_string());
        self
    }

    /// Last value written to `name`
    pub fn value(&self, name: &str) -> Option<UniformValue> {
        self.values.borrow().get(name).copied()
    }

    /// Whether `name` was ever written
    pub fn was_written(&self, name: &str) -> bool {
        self.values.borrow().contains_key(name)
    }

    /// Number of accepted writes
    pub fn write_count(&self) -> usize {
        self.write_count.get()
    }

    /// Number of `bind` calls
    pub fn bind_count(&self) -> usize {
        self.bind_count.get()
    }

    /// Forget recorded writes
    pub fn clear(&self) {
        self.values.borrow_mut().clear();
        self.write_count.set(0);
        self.bind_count.set(0);
    }

    fn record(&self, name: &str, value: UniformValue) {
        if !self.has_uniform(name) {
            return;
        }
        self.values.borrow_mut().insert(name.to_string(), value);
        self.write_count.set(self.write_count.get() + 1);
    }
}

impl UniformSink for RecordingProgram {
    fn bind(&self) {
        self.bind_count.set(self.bind_count.get() + 1);
    }

    fn has_uniform(&self, name: &str) -> bool {
        !self.removed.contains(name) && self.declared.as_ref().map_or(true, |set| set.contains(name))
    }

    fn set_vec3(&self, name: &str, value: Vec3) {
        self.record(name, UniformValue::Vec3(value));
    }

    fn set_float(&self, name: &str, value: f32) {
        self.record(name, UniformValue::Float(value));
    }

    fn set_int(&self, name: &str, value: i32) {
        self.record(name, UniformValue::Int(value));
    }

    fn set_uint(&self, name: &str, value: u32) {
        self.record(name, UniformValue::Uint(value));
    }

    fn set_mat4(&self, name: &str, value: &Mat4) {
        self.record(name, UniformValue::Mat4(*value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_set_skips_missing_uniform() {
        let program = RecordingProgram::forward_lit(1).without("lights[0].cutOff");
        assert!(!try_set(&program, "lights[0].cutOff", UniformValue::Float(0.9)));
        assert!(try_set(&program, "lights[0].linear", UniformValue::Float(0.5)));

        assert!(!program.was_written("lights[0].cutOff"));
        assert_eq!(program.value("lights[0].linear"), Some(UniformValue::Float(0.5)));
        assert_eq!(program.write_count(), 1);
    }

    #[test]
    fn test_forward_lit_layout() {
        let program = RecordingProgram::forward_lit(2);
        assert!(program.has_uniform("lights[1].outerCutOff"));
        assert!(!program.has_uniform("lights[2].position"));
        assert!(program.has_uniform("activeLightCount"));
        assert!(!program.has_uniform("u_view"));
    }

    #[test]
    fn test_accept_all_records_everything() {
        let program = RecordingProgram::accept_all();
        program.bind();
        program.set_uint("anything", 3);
        assert_eq!(program.value("anything"), Some(UniformValue::Uint(3)));
        assert_eq!(program.bind_count(), 1);

        program.clear();
        assert_eq!(program.write_count(), 0);
        assert!(program.value("anything").is_none());
    }
}
