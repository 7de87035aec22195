use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use nalgebra as na;
use na::{Matrix4, Point3, Unit, Vector3};
use obj::{load_obj, Obj};

use crate::error::{LoadError, RenderError};

/// Triangle mesh: shared vertex array plus a flat index buffer, 3 indices per triangle.
/// Immutable after construction. Positions live behind an `Arc` so the worker pool can read
/// them without copying the array every frame.
#[derive(Debug, Clone)]
pub struct Mesh {
    positions: Arc<Vec<Point3<f32>>>,
    normals: Arc<Vec<Vector3<f32>>>, // Either empty or one normal per position.
    indices: Vec<u32>,
}

impl Mesh {
    /// Builds a mesh, checking the index buffer against the vertex array.
    pub fn new(
        positions: Vec<Point3<f32>>,
        normals: Vec<Vector3<f32>>,
        indices: Vec<u32>,
    ) -> Result<Self, RenderError> {
        validate_indices(&indices, positions.len())?;
        if !normals.is_empty() && normals.len() != positions.len() {
            return Err(RenderError::NormalCountMismatch {
                normals: normals.len(),
                vertices: positions.len(),
            });
        }
        return Ok(Self {
            positions: Arc::new(positions),
            normals: Arc::new(normals),
            indices,
        });
    }

    pub fn from_obj(model: Obj<obj::Vertex, u32>) -> Result<Self, RenderError> {
        let positions = model.vertices.iter().map(|v| Point3::from(v.position)).collect();
        let normals = model.vertices.iter().map(|v| Vector3::from(v.normal)).collect();
        return Self::new(positions, normals, model.indices);
    }

    /// Loads a Wavefront OBJ file with positions and per-vertex normals.
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let model: Obj<obj::Vertex, u32> = load_obj(BufReader::new(File::open(path)?))?;
        let mesh = Self::from_obj(model)?;
        log::info!("Number of vertices - {}", mesh.vertex_count());
        log::info!("Number of indices  - {}", mesh.indices().len());
        return Ok(mesh);
    }

    pub fn positions(&self) -> &Arc<Vec<Point3<f32>>> {
        return &self.positions;
    }

    pub fn normals(&self) -> &Arc<Vec<Vector3<f32>>> {
        return &self.normals;
    }

    pub fn has_normals(&self) -> bool {
        return !self.normals.is_empty();
    }

    pub fn indices(&self) -> &[u32] {
        return &self.indices[..];
    }

    pub fn vertex_count(&self) -> usize {
        return self.positions.len();
    }

    pub fn triangle_count(&self) -> usize {
        return self.indices.len() / 3;
    }
}

/// Checks the structural contract of an index buffer: length multiple of 3 and every index
/// pointing into the vertex array.
pub fn validate_indices(indices: &[u32], vertex_count: usize) -> Result<(), RenderError> {
    if indices.len() % 3 != 0 {
        return Err(RenderError::MalformedIndices { len: indices.len() });
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(RenderError::VertexOutOfRange { index: index as usize, count: vertex_count });
    }
    return Ok(());
}

/// Mesh with its object-to-world transform. Transform calls compose by right
/// multiplication, so the last call is applied to the vertices first.
#[derive(Debug, Clone)]
pub struct Model {
    mesh: Mesh,
    model_matrix: Matrix4<f32>,
}

impl Model {
    pub fn new(mesh: Mesh) -> Self {
        return Self {
            mesh,
            model_matrix: Matrix4::identity(),
        };
    }

    pub fn mesh(&self) -> &Mesh {
        return &self.mesh;
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        return self.model_matrix;
    }

    pub fn load_identity(&mut self) {
        self.model_matrix = Matrix4::identity();
    }

    pub fn scale(&mut self, size: Vector3<f32>) {
        self.model_matrix *= Matrix4::new_nonuniform_scaling(&size);
    }

    /// Rotation by `angle` radians around `axis`. A zero axis leaves the transform alone.
    pub fn rotate(&mut self, axis: Vector3<f32>, angle: f32) {
        if let Some(axis) = Unit::try_new(axis, f32::EPSILON) {
            self.model_matrix *= Matrix4::from_axis_angle(&axis, angle);
        }
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.model_matrix *= Matrix4::new_translation(&offset);
    }
}
