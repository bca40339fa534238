//! Materials and the JSON material library
//!
//! The library is loaded from a document of the form
//!
//! ```json
//! { "materials": [
//!     { "name": "gold", "ambient": [0.25, 0.2, 0.07], "diffuse": [0.75, 0.6, 0.2],
//!       "specular": [0.63, 0.56, 0.37], "shininess": 51.2,
//!       "diffuseTexture": ["gold.png"] }
//! ] }
//! ```
//!
//! Scene objects never share a library entry: [`MaterialLibrary::instance`]
//! hands out an owned copy that the editor can tweak independently.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::render::texture::{TextureHandle, TextureManager};

/// Name of the built-in fallback material
pub const DEFAULT_MATERIAL_NAME: &str = "default";

/// Material library errors
#[derive(Error, Debug)]
pub enum MaterialError {
    /// Document could not be read
    #[error("failed to read material file: {0}")]
    Io(#[from] std::io::Error),

    /// Document is not valid JSON or lacks the `materials` array
    #[error("invalid material document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Phong material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Library name
    pub name: String,
    /// Ambient reflectance
    pub ambient: Vec3,
    /// Diffuse reflectance
    pub diffuse: Vec3,
    /// Specular reflectance
    pub specular: Vec3,
    /// Specular exponent
    pub shininess: f32,
    /// Texture bound to sampler slot 0
    pub diffuse_texture: Option<TextureHandle>,
    /// Texture bound to sampler slot 1
    pub specular_texture: Option<TextureHandle>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: DEFAULT_MATERIAL_NAME.to_string(),
            ambient: Vec3::repeat(0.1),
            diffuse: Vec3::repeat(1.0),
            specular: Vec3::repeat(1.0),
            shininess: 8.0,
            diffuse_texture: None,
            specular_texture: None,
        }
    }
}

impl Material {
    /// Untextured material with the given colours
    pub fn new(name: impl Into<String>, ambient: Vec3, diffuse: Vec3, specular: Vec3, shininess: f32) -> Self {
        Self {
            name: name.into(),
            ambient,
            diffuse,
            specular,
            shininess,
            diffuse_texture: None,
            specular_texture: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MaterialDocument {
    materials: Vec<MaterialEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaterialEntry {
    #[serde(default = "unnamed")]
    name: String,
    #[serde(default)]
    ambient: Vec<f32>,
    #[serde(default)]
    diffuse: Vec<f32>,
    #[serde(default)]
    specular: Vec<f32>,
    #[serde(default)]
    shininess: f32,
    #[serde(default)]
    diffuse_texture: Vec<String>,
    #[serde(default)]
    specular_texture: Vec<String>,
}

fn unnamed() -> String {
    "unnamed".to_string()
}

fn vec3_from(values: &[f32]) -> Option<Vec3> {
    match values {
        [x, y, z] => Some(Vec3::new(*x, *y, *z)),
        _ => None,
    }
}

/// Named material prototypes
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
}

impl MaterialLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a material document from disk
    pub fn load_file(&mut self, path: impl AsRef<Path>, textures: &mut TextureManager) -> Result<usize, MaterialError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let added = self.load_str(&contents, textures)?;
        log::info!("Loaded {} materials from {}", added, path.display());
        Ok(added)
    }

    /// Parse a material document and add its entries
    ///
    /// Entries whose colour vectors are not exactly three floats are skipped.
    /// When a name repeats, the first definition wins. Returns the number of
    /// materials added.
    pub fn load_str(&mut self, json: &str, textures: &mut TextureManager) -> Result<usize, MaterialError> {
        let document: MaterialDocument = serde_json::from_str(json)?;
        let mut added = 0;

        for entry in document.materials {
            let (Some(ambient), Some(diffuse), Some(specular)) = (
                vec3_from(&entry.ambient),
                vec3_from(&entry.diffuse),
                vec3_from(&entry.specular),
            ) else {
                log::warn!("Material \"{}\" has incorrect color vector sizes", entry.name);
                continue;
            };

            if self.materials.contains_key(&entry.name) {
                log::debug!("Material \"{}\" already defined, keeping the first", entry.name);
                continue;
            }

            let mut material = Material::new(entry.name.clone(), ambient, diffuse, specular, entry.shininess);
            material.diffuse_texture = Self::load_texture(entry.diffuse_texture.first(), textures);
            material.specular_texture = Self::load_texture(entry.specular_texture.first(), textures);

            self.materials.insert(entry.name, material);
            added += 1;
        }

        Ok(added)
    }

    fn load_texture(file_name: Option<&String>, textures: &mut TextureManager) -> Option<TextureHandle> {
        let file_name = file_name?;
        match textures.load(file_name) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Texture '{}' failed to load: {}", file_name, e);
                None
            }
        }
    }

    /// Register a material unless the name is taken
    pub fn insert(&mut self, material: Material) -> bool {
        if self.materials.contains_key(&material.name) {
            return false;
        }
        self.materials.insert(material.name.clone(), material);
        true
    }

    /// Library prototype by name
    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// Owned copy of a material, or the default material if `name` is unknown
    pub fn instance(&self, name: &str) -> Material {
        if let Some(material) = self.materials.get(name) {
            return material.clone();
        }
        log::warn!("Material \"{}\" not found, using default material", name);
        Material::default()
    }

    /// Number of materials
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DOC: &str = r#"{
        "materials": [
            { "name": "gold", "ambient": [0.25, 0.2, 0.07], "diffuse": [0.75, 0.6, 0.2],
              "specular": [0.63, 0.56, 0.37], "shininess": 51.2 },
            { "name": "broken", "ambient": [0.1, 0.1], "diffuse": [1, 1, 1], "specular": [1, 1, 1] },
            { "name": "gold", "ambient": [1, 1, 1], "diffuse": [1, 1, 1], "specular": [1, 1, 1] },
            { "name": "leather", "ambient": [0.1, 0.1, 0.1], "diffuse": [0.5, 0.3, 0.2],
              "specular": [0.1, 0.1, 0.1], "shininess": 4,
              "diffuseTexture": ["leather.png"], "specularTexture": ["leather_spec.png"] }
        ]
    }"#;

    #[test]
    fn test_load_skips_bad_vectors_and_keeps_first_definition() {
        let mut textures = TextureManager::headless();
        let mut library = MaterialLibrary::new();
        assert_eq!(library.load_str(DOC, &mut textures).unwrap(), 2);

        assert!(library.get("broken").is_none());
        let gold = library.get("gold").unwrap();
        assert_relative_eq!(gold.ambient, Vec3::new(0.25, 0.2, 0.07));
        assert_relative_eq!(gold.shininess, 51.2);
    }

    #[test]
    fn test_textures_are_loaded_through_manager() {
        let mut textures = TextureManager::headless();
        let mut library = MaterialLibrary::new();
        library.load_str(DOC, &mut textures).unwrap();

        let leather = library.get("leather").unwrap();
        assert_eq!(leather.diffuse_texture, textures.find("leather.png"));
        assert_eq!(leather.specular_texture, textures.find("leather_spec.png"));
        assert_eq!(textures.len(), 2);
    }

    #[test]
    fn test_instance_is_independent_copy() {
        let mut textures = TextureManager::headless();
        let mut library = MaterialLibrary::new();
        library.load_str(DOC, &mut textures).unwrap();

        let mut copy = library.instance("gold");
        copy.diffuse = Vec3::zeros();
        assert_relative_eq!(library.get("gold").unwrap().diffuse, Vec3::new(0.75, 0.6, 0.2));
    }

    #[test]
    fn test_unknown_material_falls_back_to_default() {
        let library = MaterialLibrary::new();
        let material = library.instance("missing");
        assert_eq!(material.name, DEFAULT_MATERIAL_NAME);
        assert_relative_eq!(material.shininess, 8.0);
        assert_relative_eq!(material.ambient, Vec3::repeat(0.1));
    }

    #[test]
    fn test_document_without_materials_array_is_an_error() {
        let mut textures = TextureManager::headless();
        let mut library = MaterialLibrary::new();
        assert!(matches!(
            library.load_str(r#"{ "shaders": [] }"#, &mut textures),
            Err(MaterialError::Parse(_))
        ));
    }
}
