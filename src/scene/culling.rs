//! Triangle culling passes. Every pass takes the current index buffer plus the vertex array
//! it points into and returns the indices of the triangles that survive. Vertex arrays are
//! never compacted, dead vertices simply stop being referenced.
//!
//! The passes index the vertex arrays directly and rely on the caller having validated the
//! index buffer, which `Scene` does once per frame.

use nalgebra as na;
use na::{Point3, Vector4};
use serde::{Deserialize, Serialize};

use super::util::from_hom_point;

/// Smallest w a vertex may have and still be divided.
pub const MIN_CLIP_W: f32 = 1e-6;

/// Keeps triangles whose front side faces the eye. Front is counter-clockwise winding
/// seen from outside (right handed normal `(v2 - v1) x (v3 - v1)`). Runs on world-space
/// positions, before the perspective divide bends the angles. Zero-area triangles are dropped.
pub(crate) fn backface_cull(indices: &[u32], world: &[Point3<f32>], eye: &Point3<f32>) -> Vec<u32> {
    let mut result = Vec::with_capacity(indices.len());
    for tri in indices.chunks_exact(3) {
        let v1 = world[tri[0] as usize];
        let v2 = world[tri[1] as usize];
        let v3 = world[tri[2] as usize];
        let normal = match (v2 - v1).cross(&(v3 - v1)).try_normalize(f32::EPSILON) {
            Some(normal) => normal,
            None => continue,
        };
        if (eye - v1).dot(&normal) > 0.0 {
            result.extend_from_slice(tri);
        }
    }
    return result;
}

/// Bit per frustum half-space the clip-space vertex lies strictly outside of.
fn outcode(v: &Vector4<f32>) -> u8 {
    let mut code = 0;
    if v.x < -v.w { code |= 1 << 0; }
    if v.x > v.w  { code |= 1 << 1; }
    if v.y < -v.w { code |= 1 << 2; }
    if v.y > v.w  { code |= 1 << 3; }
    if v.z < -v.w { code |= 1 << 4; }
    if v.z > v.w  { code |= 1 << 5; }
    return code;
}

/// Trivial reject in clip space: a triangle goes when all three vertices are outside the
/// same plane. Straddling triangles are kept whole, there is no geometric clipping.
///
/// One exception to the shared plane rule: a triangle with any vertex at `w <= MIN_CLIP_W`
/// (on or behind the eye plane) is dropped even when no single plane rejects all three
/// vertices. Without clipping such a vertex can not be divided into anything meaningful.
pub(crate) fn clip_cull(indices: &[u32], clip: &[Vector4<f32>]) -> Vec<u32> {
    let mut result = Vec::with_capacity(indices.len());
    for tri in indices.chunks_exact(3) {
        let vertices = [clip[tri[0] as usize], clip[tri[1] as usize], clip[tri[2] as usize]];
        if vertices.iter().any(|v| v.w <= MIN_CLIP_W) {
            continue;
        }
        if outcode(&vertices[0]) & outcode(&vertices[1]) & outcode(&vertices[2]) != 0 {
            continue;
        }
        result.extend_from_slice(tri);
    }
    return result;
}

/// Result of the perspective divide.
pub struct Divided {
    /// NDC positions, same length as the clip array. Unreferenced slots stay at the origin.
    pub ndc: Vec<Point3<f32>>,
    /// Number of vertices actually divided.
    pub count: usize,
}

/// Divides every vertex referenced by `indices` exactly once, shared vertices included.
pub(crate) fn perspective_divide(indices: &[u32], clip: &[Vector4<f32>]) -> Divided {
    let mut ndc = vec![Point3::origin(); clip.len()];
    let mut divided = vec![false; clip.len()];
    let mut count = 0;
    for &index in indices {
        let index = index as usize;
        if divided[index] {
            continue;
        }
        // clip_cull already dropped everything with w near 0.
        if let Some(p) = from_hom_point(&clip[index]) {
            ndc[index] = p;
        }
        divided[index] = true;
        count += 1;
    }
    return Divided { ndc, count };
}

/// Whether a coordinate sitting exactly on the NDC cube face counts as inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NdcBounds {
    Inclusive,
    Exclusive,
}

impl NdcBounds {
    fn contains(&self, value: f32) -> bool {
        match self {
            NdcBounds::Inclusive => (-1.0..=1.0).contains(&value),
            NdcBounds::Exclusive => value > -1.0 && value < 1.0,
        }
    }

    fn contains_point(&self, p: &Point3<f32>) -> bool {
        return self.contains(p.x) && self.contains(p.y) && self.contains(p.z);
    }
}

/// Post-divide pass: keeps a triangle only when all three vertices lie inside the NDC cube.
pub(crate) fn ndc_cull(indices: &[u32], ndc: &[Point3<f32>], bounds: NdcBounds) -> Vec<u32> {
    let mut result = Vec::with_capacity(indices.len());
    for tri in indices.chunks_exact(3) {
        if tri.iter().all(|&i| bounds.contains_point(&ndc[i as usize])) {
            result.extend_from_slice(tri);
        }
    }
    return result;
}
