//! Mesh geometry and the shared base-mesh library
//!
//! Meshes are immutable once built and shared between scene objects as
//! `Rc<Mesh>`. The library registers the base primitives the editor spawns
//! (cube, sphere, triangle, square, circle) up front, plus the plane the
//! ground grid is drawn on.

use std::collections::HashMap;
use std::f32::consts::{PI, TAU};
use std::rc::Rc;

/// Half size of the editor ground grid
pub const GRID_HALF_EXTENT: f32 = 100.0;

/// Vertex structure for 3D rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Library name
    pub name: String,

    /// Vertex data
    pub vertices: Vec<Vertex>,

    /// Index data for triangles
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new mesh
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
        }
    }

    /// Number of triangles in the mesh
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Unit cube centered at the origin with vertices at ±1.0 on each axis
    pub fn cube() -> Self {
        let vertices = vec![
            // Front face
            Vertex::new([-1.0, -1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, -1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new([-1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            // Back face
            Vertex::new([-1.0, -1.0, -1.0], [0.0, 0.0, -1.0], [1.0, 0.0]),
            Vertex::new([-1.0, 1.0, -1.0], [0.0, 0.0, -1.0], [1.0, 1.0]),
            Vertex::new([1.0, 1.0, -1.0], [0.0, 0.0, -1.0], [0.0, 1.0]),
            Vertex::new([1.0, -1.0, -1.0], [0.0, 0.0, -1.0], [0.0, 0.0]),
        ];

        let indices = vec![
            // Front
            0, 1, 2, 2, 3, 0,
            // Back
            4, 5, 6, 6, 7, 4,
            // Left
            4, 0, 3, 3, 5, 4,
            // Right
            1, 7, 6, 6, 2, 1,
            // Top
            3, 2, 6, 6, 5, 3,
            // Bottom
            4, 7, 1, 1, 0, 4,
        ];

        Self::new("cube", vertices, indices)
    }

    /// UV sphere of radius 1 with `stacks` latitude and `sectors` longitude bands
    pub fn sphere(stacks: u32, sectors: u32) -> Self {
        let stacks = stacks.max(2);
        let sectors = sectors.max(3);
        let mut vertices = Vec::with_capacity(((stacks + 1) * (sectors + 1)) as usize);

        for i in 0..=stacks {
            let v = i as f32 / stacks as f32;
            let phi = PI / 2.0 - v * PI;
            let (ring_y, ring_radius) = (phi.sin(), phi.cos());

            for j in 0..=sectors {
                let u = j as f32 / sectors as f32;
                let theta = u * TAU;
                let p = [ring_radius * theta.cos(), ring_y, ring_radius * theta.sin()];
                vertices.push(Vertex::new(p, p, [u, v]));
            }
        }

        let mut indices = Vec::with_capacity((stacks * sectors * 6) as usize);
        for i in 0..stacks {
            let row = i * (sectors + 1);
            let next = row + sectors + 1;
            for j in 0..sectors {
                // Pole rows collapse to a single triangle per sector
                if i != 0 {
                    indices.extend_from_slice(&[row + j, next + j, row + j + 1]);
                }
                if i != stacks - 1 {
                    indices.extend_from_slice(&[row + j + 1, next + j, next + j + 1]);
                }
            }
        }

        Self::new("sphere", vertices, indices)
    }

    /// Single triangle in the XY plane
    pub fn triangle() -> Self {
        let normal = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([-1.0, -1.0, 0.0], normal, [0.0, 0.0]),
            Vertex::new([1.0, -1.0, 0.0], normal, [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], normal, [0.5, 1.0]),
        ];
        Self::new("triangle", vertices, vec![0, 1, 2])
    }

    /// Unit quad in the XY plane
    pub fn square() -> Self {
        let normal = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([-1.0, -1.0, 0.0], normal, [0.0, 0.0]),
            Vertex::new([1.0, -1.0, 0.0], normal, [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 0.0], normal, [1.0, 1.0]),
            Vertex::new([-1.0, 1.0, 0.0], normal, [0.0, 1.0]),
        ];
        Self::new("square", vertices, vec![0, 1, 2, 2, 3, 0])
    }

    /// Flat XZ quad spanning `[-half_extent, half_extent]`, named `grid`
    ///
    /// The grid shader draws the lines procedurally over this plane.
    pub fn grid_plane(half_extent: f32) -> Self {
        let normal = [0.0, 1.0, 0.0];
        let e = half_extent;
        let vertices = vec![
            Vertex::new([-e, 0.0, -e], normal, [0.0, 0.0]),
            Vertex::new([e, 0.0, -e], normal, [1.0, 0.0]),
            Vertex::new([e, 0.0, e], normal, [1.0, 1.0]),
            Vertex::new([-e, 0.0, e], normal, [0.0, 1.0]),
        ];
        Self::new("grid", vertices, vec![0, 2, 1, 2, 0, 3])
    }

    /// Triangle-fan disc in the XY plane
    pub fn circle(segments: u32) -> Self {
        let segments = segments.max(3);
        let normal = [0.0, 0.0, 1.0];
        let mut vertices = vec![Vertex::new([0.0, 0.0, 0.0], normal, [0.5, 0.5])];

        for i in 0..segments {
            let angle = i as f32 / segments as f32 * TAU;
            let (s, c) = angle.sin_cos();
            vertices.push(Vertex::new([c, s, 0.0], normal, [0.5 + c * 0.5, 0.5 + s * 0.5]));
        }

        let indices = (0..segments)
            .flat_map(|i| [0, i + 1, (i + 1) % segments + 1])
            .collect();

        Self::new("circle", vertices, indices)
    }
}

/// Named collection of shared meshes
#[derive(Debug, Default)]
pub struct MeshLibrary {
    meshes: HashMap<String, Rc<Mesh>>,
}

impl MeshLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library holding the base primitives
    pub fn with_base_meshes() -> Self {
        let mut library = Self::new();
        for mesh in [
            Mesh::cube(),
            Mesh::sphere(16, 32),
            Mesh::triangle(),
            Mesh::square(),
            Mesh::circle(32),
            Mesh::grid_plane(GRID_HALF_EXTENT),
        ] {
            library.insert(mesh);
        }
        log::debug!("Registered {} base meshes", library.len());
        library
    }

    /// Register a mesh under its own name, replacing any previous entry
    pub fn insert(&mut self, mesh: Mesh) -> Rc<Mesh> {
        let mesh = Rc::new(mesh);
        self.meshes.insert(mesh.name.clone(), Rc::clone(&mesh));
        mesh
    }

    /// Shared handle to a mesh
    pub fn get(&self, name: &str) -> Option<Rc<Mesh>> {
        self.meshes.get(name).cloned()
    }

    /// Number of registered meshes
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}
