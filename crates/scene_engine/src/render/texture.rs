//! Texture registry
//!
//! Textures are loaded once per name through a [`TextureBackend`] and handed
//! out as typed slotmap handles. The backend owns the actual image decoding
//! and GPU upload; the registry only maps names to GPU ids.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::foundation::collections::{HandleMap, TypedHandle};

/// Backend GPU texture id (0 means "no texture")
pub type GpuTextureId = u32;

/// Handle to a texture stored in a [`TextureManager`]
pub type TextureHandle = TypedHandle<Texture>;

/// Texture loading errors
#[derive(Error, Debug)]
pub enum TextureError {
    /// Image file could not be read
    #[error("failed to read texture '{path}': {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backend rejected the image
    #[error("texture backend rejected '{0}': {1}")]
    Backend(String, String),
}

/// GPU-side texture operations
pub trait TextureBackend {
    /// Decode and upload the image at `path`, returning its GPU id
    fn load(&mut self, path: &Path) -> Result<GpuTextureId, TextureError>;

    /// Bind a texture to a sampler slot
    fn bind(&self, id: GpuTextureId, slot: u32);
}

/// Headless backend that hands out sequential ids without touching the disk
#[derive(Debug)]
pub struct NullTextureBackend {
    next_id: GpuTextureId,
    binds: RefCell<Vec<(GpuTextureId, u32)>>,
}

impl Default for NullTextureBackend {
    fn default() -> Self {
        Self {
            next_id: 1,
            binds: RefCell::new(Vec::new()),
        }
    }
}

impl NullTextureBackend {
    /// Create a backend whose first id is 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(id, slot)` pair bound so far
    pub fn binds(&self) -> Vec<(GpuTextureId, u32)> {
        self.binds.borrow().clone()
    }
}

impl TextureBackend for NullTextureBackend {
    fn load(&mut self, path: &Path) -> Result<GpuTextureId, TextureError> {
        let id = self.next_id;
        self.next_id += 1;
        log::trace!("Null texture backend assigned id {} to {}", id, path.display());
        Ok(id)
    }

    fn bind(&self, id: GpuTextureId, slot: u32) {
        self.binds.borrow_mut().push((id, slot));
    }
}

/// Loaded texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    /// Registry name (the file name from the material document)
    pub name: String,
    /// Resolved path on disk
    pub path: PathBuf,
    /// Backend id
    pub gpu_id: GpuTextureId,
}

/// Name-indexed texture registry
pub struct TextureManager {
    backend: Box<dyn TextureBackend>,
    assets_dir: PathBuf,
    textures: HandleMap<Texture>,
    by_name: HashMap<String, TextureHandle>,
}

impl TextureManager {
    /// Create a manager resolving file names against `assets_dir`
    pub fn new(backend: Box<dyn TextureBackend>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            assets_dir: assets_dir.into(),
            textures: HandleMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Headless manager backed by [`NullTextureBackend`]
    pub fn headless() -> Self {
        Self::new(Box::new(NullTextureBackend::new()), "assets")
    }

    /// Load `<assets_dir>/<file_name>`, or return the cached handle
    pub fn load(&mut self, file_name: &str) -> Result<TextureHandle, TextureError> {
        if let Some(handle) = self.by_name.get(file_name) {
            return Ok(*handle);
        }

        let path = self.assets_dir.join(file_name);
        let gpu_id = self.backend.load(&path)?;
        let key = self.textures.insert(Texture {
            name: file_name.to_string(),
            path,
            gpu_id,
        });
        let handle = TextureHandle::new(key);
        self.by_name.insert(file_name.to_string(), handle);

        log::info!("Loaded texture '{}' (gpu id {})", file_name, gpu_id);
        Ok(handle)
    }

    /// Look up a loaded texture by name
    pub fn find(&self, name: &str) -> Option<TextureHandle> {
        self.by_name.get(name).copied()
    }

    /// Texture data for a handle
    pub fn get(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle.key())
    }

    /// Bind a texture to a sampler slot; returns false for stale handles
    pub fn bind(&self, handle: TextureHandle, slot: u32) -> bool {
        match self.get(handle) {
            Some(texture) if texture.gpu_id != 0 => {
                self.backend.bind(texture.gpu_id, slot);
                true
            }
            _ => {
                log::warn!("Texture handle {:?} is not bound to a GPU texture", handle.key());
                false
            }
        }
    }

    /// Number of loaded textures
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether nothing is loaded
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl std::fmt::Debug for TextureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureManager")
            .field("assets_dir", &self.assets_dir)
            .field("textures", &self.textures.len())
            .finish_non_exhaustive()
    }
}
