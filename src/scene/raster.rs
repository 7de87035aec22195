//! Bounding box triangle rasterizer.
//!
//! Vertices are snapped to a fixed-point grid with 8 bits of sub-pixel precision and the
//! three edge functions are evaluated exactly in integers at pixel centers. A pixel center
//! lying exactly on an edge belongs to the triangle only when that edge is a top or a left
//! edge, so two triangles sharing an edge never both cover, nor both miss, a pixel on it.
//! Screen space has x to the right and y down.
//!
//! Triangles reaching past `GUARD_BAND`, usually ones straddling the near plane, would
//! overflow the integer edge functions. They go through `WideTriangleSetup` instead: same
//! snapping, bounding box clamped to the buffer in floating point, edge functions in f64.
//!
//! Attributes are interpolated affinely with the screen-space barycentric coordinates.

use std::ops::RangeInclusive;

use nalgebra as na;
use na::{vector, Point3, Vector3};

use super::buffer::{RowMut, ScreenBuffer};
use super::model::validate_indices;
use super::shader::{DrawParams, Fragment, Shader};
use crate::error::RenderError;

const SUBPIXEL_BITS: u32 = 8;
const SUBPIXEL_ONE: i64 = 1 << SUBPIXEL_BITS;
const HALF_PIXEL: i64 = SUBPIXEL_ONE / 2;

/// Triangles reaching further than this many pixels from the origin are not rasterized on
/// the integer path, it keeps every edge function product inside i64.
pub const GUARD_BAND: f32 = (1 << 20) as f32;

fn to_fixed(v: f32) -> i64 {
    return (v * SUBPIXEL_ONE as f32).round() as i64;
}

/// False for NaN as well.
fn in_guard_band(points: &[Point3<f32>; 3]) -> bool {
    return points.iter().all(|p| p.x.abs() < GUARD_BAND && p.y.abs() < GUARD_BAND);
}

/// Edge from `a` in direction (dx, dy), oriented so the triangle interior is positive.
#[derive(Debug, Clone, Copy)]
struct Edge {
    ax: i64,
    ay: i64,
    dx: i64,
    dy: i64,
    top_left: bool,
}

impl Edge {
    fn new(from: (i64, i64), to: (i64, i64), orientation: i64) -> Self {
        let dx = (to.0 - from.0) * orientation;
        let dy = (to.1 - from.1) * orientation;
        return Self {
            ax: from.0,
            ay: from.1,
            dx,
            dy,
            // Interior is on the right of the direction of travel with y down, so top edges
            // run to the right and left edges run up.
            top_left: (dy == 0 && dx > 0) || dy < 0,
        };
    }

    fn eval(&self, px: i64, py: i64) -> i64 {
        return self.dx * (py - self.ay) - self.dy * (px - self.ax);
    }

    fn covers(&self, w: i64) -> bool {
        return w > 0 || (w == 0 && self.top_left);
    }

    fn step_x(&self) -> i64 {
        return -self.dy * SUBPIXEL_ONE;
    }

    fn step_y(&self) -> i64 {
        return self.dx * SUBPIXEL_ONE;
    }
}

/// Per-triangle rasterization setup. `edges[i]` is the edge opposite to vertex `i`, so its
/// value is the unnormalized barycentric weight of that vertex.
#[derive(Debug, Clone)]
pub struct TriangleSetup {
    edges: [Edge; 3],
    area: i64, // Twice the triangle area in fixed-point units, always > 0.
    min: (i64, i64),
    max: (i64, i64),
}

fn sample_point(x: usize, y: usize) -> (i64, i64) {
    return ((x as i64) * SUBPIXEL_ONE + HALF_PIXEL, (y as i64) * SUBPIXEL_ONE + HALF_PIXEL);
}

impl TriangleSetup {
    /// Returns None for zero-area triangles and for triangles outside the guard band.
    /// Winding does not matter here, backfaces are culled before rasterization.
    pub fn new(points: &[Point3<f32>; 3]) -> Option<Self> {
        if !in_guard_band(points) {
            return None;
        }
        let v: Vec<(i64, i64)> = points.iter().map(|p| (to_fixed(p.x), to_fixed(p.y))).collect();

        let signed_area = (v[1].0 - v[0].0) * (v[2].1 - v[0].1) - (v[1].1 - v[0].1) * (v[2].0 - v[0].0);
        if signed_area == 0 {
            return None;
        }
        let orientation = signed_area.signum();

        return Some(Self {
            edges: [
                Edge::new(v[1], v[2], orientation),
                Edge::new(v[2], v[0], orientation),
                Edge::new(v[0], v[1], orientation),
            ],
            area: signed_area * orientation,
            min: (v.iter().map(|p| p.0).min()?, v.iter().map(|p| p.1).min()?),
            max: (v.iter().map(|p| p.0).max()?, v.iter().map(|p| p.1).max()?),
        });
    }

    /// Pixels whose centers can fall inside the triangle, clamped to the buffer.
    pub fn pixel_bounds(
        &self,
        width: usize,
        height: usize,
    ) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        // First pixel with center >= lo, last pixel with center <= hi.
        fn first(lo: i64) -> i64 {
            return -((HALF_PIXEL - lo).div_euclid(SUBPIXEL_ONE));
        }
        fn last(hi: i64) -> i64 {
            return (hi - HALF_PIXEL).div_euclid(SUBPIXEL_ONE);
        }

        if width == 0 || height == 0 {
            return None;
        }
        let x0 = first(self.min.0).max(0);
        let y0 = first(self.min.1).max(0);
        let x1 = last(self.max.0).min(width as i64 - 1);
        let y1 = last(self.max.1).min(height as i64 - 1);
        if x0 > x1 || y0 > y1 {
            return None;
        }
        return Some((x0 as usize..=x1 as usize, y0 as usize..=y1 as usize));
    }

    fn weights_at(&self, (px, py): (i64, i64)) -> [i64; 3] {
        return [self.edges[0].eval(px, py), self.edges[1].eval(px, py), self.edges[2].eval(px, py)];
    }

    fn covers(&self, w: &[i64; 3]) -> bool {
        return self.edges[0].covers(w[0]) && self.edges[1].covers(w[1]) && self.edges[2].covers(w[2]);
    }

    fn normalize(&self, w: &[i64; 3]) -> Vector3<f32> {
        let area = self.area as f64;
        return vector![
            (w[0] as f64 / area) as f32,
            (w[1] as f64 / area) as f32,
            (w[2] as f64 / area) as f32
        ];
    }

    /// Barycentric coordinates of the center of pixel (x, y), None when the fill rule puts
    /// that center outside the triangle.
    pub fn barycentric(&self, x: usize, y: usize) -> Option<Vector3<f32>> {
        let w = self.weights_at(sample_point(x, y));
        if !self.covers(&w) {
            return None;
        }
        return Some(self.normalize(&w));
    }
}

#[derive(Debug, Clone, Copy)]
struct WideEdge {
    ax: f64,
    ay: f64,
    dx: f64,
    dy: f64,
    top_left: bool,
}

impl WideEdge {
    fn new(from: (f64, f64), to: (f64, f64), orientation: f64) -> Self {
        let dx = (to.0 - from.0) * orientation;
        let dy = (to.1 - from.1) * orientation;
        return Self {
            ax: from.0,
            ay: from.1,
            dx,
            dy,
            top_left: (dy == 0.0 && dx > 0.0) || dy < 0.0,
        };
    }

    fn eval(&self, px: f64, py: f64) -> f64 {
        return self.dx * (py - self.ay) - self.dy * (px - self.ax);
    }

    fn covers(&self, w: f64) -> bool {
        return w > 0.0 || (w == 0.0 && self.top_left);
    }
}

/// Setup for triangles past the guard band. Vertices are snapped to the same sub-pixel grid
/// as in `TriangleSetup`, but the edge functions are rounded, so a pixel center within
/// rounding distance of an edge may end up on either side of it.
#[derive(Debug, Clone)]
pub struct WideTriangleSetup {
    edges: [WideEdge; 3],
    area: f64,
    min: (f64, f64),
    max: (f64, f64),
}

impl WideTriangleSetup {
    /// Returns None for zero-area and non-finite triangles. Works for any finite triangle,
    /// in or out of the guard band.
    pub fn new(points: &[Point3<f32>; 3]) -> Option<Self> {
        if !points.iter().all(|p| p.x.is_finite() && p.y.is_finite()) {
            return None;
        }
        let one = SUBPIXEL_ONE as f64;
        let v: Vec<(f64, f64)> = points
            .iter()
            .map(|p| ((p.x as f64 * one).round(), (p.y as f64 * one).round()))
            .collect();

        let signed_area = (v[1].0 - v[0].0) * (v[2].1 - v[0].1) - (v[1].1 - v[0].1) * (v[2].0 - v[0].0);
        if signed_area == 0.0 || !signed_area.is_finite() {
            return None;
        }
        let orientation = signed_area.signum();

        let min_of = |f: fn(&(f64, f64)) -> f64| v.iter().map(f).fold(f64::INFINITY, f64::min);
        let max_of = |f: fn(&(f64, f64)) -> f64| v.iter().map(f).fold(f64::NEG_INFINITY, f64::max);
        return Some(Self {
            edges: [
                WideEdge::new(v[1], v[2], orientation),
                WideEdge::new(v[2], v[0], orientation),
                WideEdge::new(v[0], v[1], orientation),
            ],
            area: signed_area * orientation,
            min: (min_of(|p| p.0), min_of(|p| p.1)),
            max: (max_of(|p| p.0), max_of(|p| p.1)),
        });
    }

    /// Same contract as `TriangleSetup::pixel_bounds`, clamped before leaving f64.
    pub fn pixel_bounds(
        &self,
        width: usize,
        height: usize,
    ) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        fn clamp(lo: f64, hi: f64, size: usize) -> Option<RangeInclusive<usize>> {
            let one = SUBPIXEL_ONE as f64;
            let half = HALF_PIXEL as f64;
            let first = ((lo - half) / one).ceil().max(0.0);
            let last = ((hi - half) / one).floor().min(size as f64 - 1.0);
            if size == 0 || first > last {
                return None;
            }
            return Some(first as usize..=last as usize);
        }

        return Some((clamp(self.min.0, self.max.0, width)?, clamp(self.min.1, self.max.1, height)?));
    }

    pub fn barycentric(&self, x: usize, y: usize) -> Option<Vector3<f32>> {
        let (px, py) = sample_point(x, y);
        let (px, py) = (px as f64, py as f64);
        let w = [self.edges[0].eval(px, py), self.edges[1].eval(px, py), self.edges[2].eval(px, py)];
        if !(self.edges[0].covers(w[0]) && self.edges[1].covers(w[1]) && self.edges[2].covers(w[2])) {
            return None;
        }
        return Some(vector![
            (w[0] / self.area) as f32,
            (w[1] / self.area) as f32,
            (w[2] / self.area) as f32
        ]);
    }
}

/// Triangle ready for rasterization: viewport-mapped positions plus the world-space data the
/// shader needs.
#[derive(Debug, Clone, Copy)]
pub struct RasterTriangle {
    pub screen: [Point3<f32>; 3], // Pixel x, y and depth in [0, 1].
    pub world: [Point3<f32>; 3],
    pub normals: Option<[Vector3<f32>; 3]>, // World-space unit vertex normals.
}

/// Attributes shared by every fragment of one triangle.
struct TriangleShading<'a> {
    triangle: &'a RasterTriangle,
    face_normal: Vector3<f32>,
    centroid: Point3<f32>,
}

impl<'a> TriangleShading<'a> {
    fn new(triangle: &'a RasterTriangle) -> Self {
        let [p0, p1, p2] = triangle.world;
        return Self {
            triangle,
            face_normal: (p1 - p0).cross(&(p2 - p0)).try_normalize(f32::EPSILON).unwrap_or(Vector3::z()),
            centroid: Point3::from((p0.coords + p1.coords + p2.coords) / 3.0),
        };
    }

    /// Depth test and shading of one covered pixel, true when the pixel was written.
    fn shade(
        &self,
        color_row: &mut RowMut<'_, Vector3<f32>>,
        depth_row: &mut RowMut<'_, f32>,
        (x, y): (usize, usize),
        barycentric: Vector3<f32>,
        shader: &dyn Shader,
        params: &DrawParams,
    ) -> Result<bool, RenderError> {
        let [s0, s1, s2] = self.triangle.screen;
        // z0 + b1 (z1 - z0) + b2 (z2 - z0), exact for flat depth.
        let depth = s0.z + barycentric.y * (s1.z - s0.z) + barycentric.z * (s2.z - s0.z);
        if !(0.0..=1.0).contains(&depth) || depth >= *depth_row.get(x)? {
            return Ok(false);
        }

        let [p0, p1, p2] = self.triangle.world;
        let world_position = Point3::from(p0.coords * barycentric.x + p1.coords * barycentric.y + p2.coords * barycentric.z);
        let normal = match self.triangle.normals {
            Some([n0, n1, n2]) => (n0 * barycentric.x + n1 * barycentric.y + n2 * barycentric.z)
                .try_normalize(f32::EPSILON)
                .unwrap_or(self.face_normal),
            None => self.face_normal,
        };
        let fragment = Fragment {
            x,
            y,
            depth,
            barycentric,
            world_position,
            centroid: self.centroid,
            face_normal: self.face_normal,
            normal,
        };
        match shader.fragment(&fragment, params) {
            Some(color) => {
                depth_row.set(x, depth)?;
                color_row.set(x, color)?;
                return Ok(true);
            }
            None => return Ok(false),
        }
    }
}

/// Integer path, edge functions stepped incrementally across the box.
fn draw_exact(
    buffer: &mut ScreenBuffer,
    setup: &TriangleSetup,
    shading: &TriangleShading,
    shader: &dyn Shader,
    params: &DrawParams,
) -> Result<usize, RenderError> {
    let (columns, rows) = match setup.pixel_bounds(buffer.width(), buffer.height()) {
        Some(bounds) => bounds,
        None => return Ok(0),
    };

    let mut written = 0;
    let mut row_w = setup.weights_at(sample_point(*columns.start(), *rows.start()));
    for y in rows {
        let (mut color_row, mut depth_row) = buffer.rows_mut(y)?;
        let mut w = row_w;
        for x in columns.clone() {
            if setup.covers(&w)
                && shading.shade(&mut color_row, &mut depth_row, (x, y), setup.normalize(&w), shader, params)?
            {
                written += 1;
            }
            for i in 0..3 {
                w[i] += setup.edges[i].step_x();
            }
        }
        for i in 0..3 {
            row_w[i] += setup.edges[i].step_y();
        }
    }
    return Ok(written);
}

fn draw_wide(
    buffer: &mut ScreenBuffer,
    setup: &WideTriangleSetup,
    shading: &TriangleShading,
    shader: &dyn Shader,
    params: &DrawParams,
) -> Result<usize, RenderError> {
    let (columns, rows) = match setup.pixel_bounds(buffer.width(), buffer.height()) {
        Some(bounds) => bounds,
        None => return Ok(0),
    };
    log::trace!("wide triangle over columns {:?}, rows {:?}", columns, rows);

    let mut written = 0;
    for y in rows {
        let (mut color_row, mut depth_row) = buffer.rows_mut(y)?;
        for x in columns.clone() {
            if let Some(barycentric) = setup.barycentric(x, y) {
                if shading.shade(&mut color_row, &mut depth_row, (x, y), barycentric, shader, params)? {
                    written += 1;
                }
            }
        }
    }
    return Ok(written);
}

/// Rasterizes one triangle with the depth test, returns the number of pixels written.
///
/// Depth convention is "less wins" against a buffer cleared to +inf. Fragments with depth
/// outside [0, 1] lie beyond the near or far plane and are dropped.
pub fn draw_triangle(
    buffer: &mut ScreenBuffer,
    triangle: &RasterTriangle,
    shader: &dyn Shader,
    params: &DrawParams,
) -> Result<usize, RenderError> {
    let shading = TriangleShading::new(triangle);
    if in_guard_band(&triangle.screen) {
        return match TriangleSetup::new(&triangle.screen) {
            Some(setup) => draw_exact(buffer, &setup, &shading, shader, params),
            None => Ok(0),
        };
    }
    return match WideTriangleSetup::new(&triangle.screen) {
        Some(setup) => draw_wide(buffer, &setup, &shading, shader, params),
        None => Ok(0),
    };
}

/// Rasterizes every triangle of the index buffer in submission order. The index buffer is
/// checked against the vertex arrays first, nothing is drawn when it does not fit them.
pub fn draw_triangles(
    buffer: &mut ScreenBuffer,
    indices: &[u32],
    screen: &[Point3<f32>],
    world: &[Point3<f32>],
    normals: Option<&[Vector3<f32>]>,
    shader: &dyn Shader,
    params: &DrawParams,
) -> Result<usize, RenderError> {
    validate_indices(indices, screen.len().min(world.len()))?;
    if let Some(normals) = normals {
        if normals.len() != screen.len() {
            return Err(RenderError::NormalCountMismatch {
                normals: normals.len(),
                vertices: screen.len(),
            });
        }
    }

    let mut written = 0;
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let triangle = RasterTriangle {
            screen: [screen[a], screen[b], screen[c]],
            world: [world[a], world[b], world[c]],
            normals: normals.map(|n| [n[a], n[b], n[c]]),
        };
        written += draw_triangle(buffer, &triangle, shader, params)?;
    }
    return Ok(written);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::shader::FlatShader;
    use na::{point, Matrix4};

    fn params() -> DrawParams {
        let mut params = DrawParams::new(
            Matrix4::identity(),
            Matrix4::identity(),
            Matrix4::identity(),
            point![0.0, 0.0, 10.0],
        );
        params.lighting.light_position = point![0.0, 0.0, 100.0];
        params.lighting.ambient = 0.0;
        return params;
    }

    fn flat(screen: [Point3<f32>; 3]) -> RasterTriangle {
        let world = [point![0.0, 0.0, 0.0], point![1.0, 0.0, 0.0], point![0.0, 1.0, 0.0]];
        return RasterTriangle { screen, world, normals: None };
    }

    #[test]
    fn zero_area_triangle_has_no_setup() {
        let points = [point![1.0, 1.0, 0.0], point![5.0, 5.0, 0.0], point![9.0, 9.0, 0.0]];
        assert!(TriangleSetup::new(&points).is_none());
        let points = [point![1.0, 1.0, 0.0], point![f32::NAN, 5.0, 0.0], point![9.0, 2.0, 0.0]];
        assert!(TriangleSetup::new(&points).is_none());
    }

    #[test]
    fn barycentric_weights_sum_to_one() {
        let points = [point![10.0, 10.0, 0.0], point![20.0, 10.0, 0.0], point![10.0, 20.0, 0.0]];
        let setup = TriangleSetup::new(&points).unwrap();
        let b = setup.barycentric(12, 11).unwrap();
        assert!((b.x + b.y + b.z - 1.0).abs() < 1e-6);
        // Center (12.5, 11.5) sits at 0.25 of the x edge and 0.15 of the y edge.
        assert!((b.y - 0.25).abs() < 1e-6);
        assert!((b.z - 0.15).abs() < 1e-6);
        assert!(setup.barycentric(19, 19).is_none());
    }

    #[test]
    fn winding_does_not_change_coverage() {
        let ccw = TriangleSetup::new(&[point![2.0, 3.0, 0.0], point![15.5, 4.0, 0.0], point![6.0, 14.0, 0.0]]).unwrap();
        let cw = TriangleSetup::new(&[point![2.0, 3.0, 0.0], point![6.0, 14.0, 0.0], point![15.5, 4.0, 0.0]]).unwrap();
        for y in 0..20 {
            for x in 0..20 {
                assert_eq!(ccw.barycentric(x, y).is_some(), cw.barycentric(x, y).is_some());
            }
        }
    }

    #[test]
    fn bounds_are_clamped_to_buffer() {
        let setup = TriangleSetup::new(&[point![-50.0, -50.0, 0.0], point![80.0, 5.0, 0.0], point![5.0, 80.0, 0.0]]).unwrap();
        let (columns, rows) = setup.pixel_bounds(30, 20).unwrap();
        assert_eq!(columns, 0..=29);
        assert_eq!(rows, 0..=19);

        let away = TriangleSetup::new(&[point![40.0, 1.0, 0.0], point![50.0, 1.0, 0.0], point![45.0, 9.0, 0.0]]).unwrap();
        assert!(away.pixel_bounds(30, 20).is_none());
    }

    #[test]
    fn top_left_rule_on_axis_aligned_square() {
        // Outer edges sit on integers and miss every center, the diagonal runs through them.
        let upper = TriangleSetup::new(&[point![0.0, 0.0, 0.0], point![4.0, 0.0, 0.0], point![4.0, 4.0, 0.0]]).unwrap();
        let lower = TriangleSetup::new(&[point![0.0, 0.0, 0.0], point![4.0, 4.0, 0.0], point![0.0, 4.0, 0.0]]).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let hits = upper.barycentric(x, y).is_some() as u32 + lower.barycentric(x, y).is_some() as u32;
                assert_eq!(hits, 1, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn edge_through_pixel_centers_goes_to_one_side() {
        // Vertical shared edge at x = 5.5, right through the centers of column 5.
        let left = TriangleSetup::new(&[point![0.5, 0.5, 0.0], point![5.5, 0.5, 0.0], point![5.5, 9.5, 0.0]]).unwrap();
        let right = TriangleSetup::new(&[point![5.5, 0.5, 0.0], point![9.5, 9.5, 0.0], point![5.5, 9.5, 0.0]]).unwrap();
        for y in 1..9 {
            let hits = left.barycentric(5, y).is_some() as u32 + right.barycentric(5, y).is_some() as u32;
            assert_eq!(hits, 1, "row {}", y);
        }
        // The shared edge is the left edge of the right triangle.
        assert!(right.barycentric(5, 4).is_some());
    }

    #[test]
    fn unit_triangle_scenario() {
        let mut buffer = ScreenBuffer::new(30, 30, vector![0.1, 0.2, 0.3]);
        let triangle = flat([point![10.0, 10.0, 0.5], point![20.0, 10.0, 0.5], point![10.0, 20.0, 0.5]]);
        let written = draw_triangle(&mut buffer, &triangle, &FlatShader, &params()).unwrap();
        assert!(written > 0);

        assert_ne!(*buffer.row(11).unwrap().get(11).unwrap(), vector![0.1, 0.2, 0.3]);
        assert_eq!(*buffer.z(11).unwrap().get(11).unwrap(), 0.5);
        assert_eq!(*buffer.row(25).unwrap().get(25).unwrap(), vector![0.1, 0.2, 0.3]);
        assert_eq!(*buffer.z(25).unwrap().get(25).unwrap(), f32::INFINITY);

        for y in 0..30 {
            for x in 0..30 {
                let z = *buffer.z(y).unwrap().get(x).unwrap();
                assert!(z == 0.5 || z == f32::INFINITY);
            }
        }
    }

    #[test]
    fn fragments_behind_far_plane_are_dropped() {
        let mut buffer = ScreenBuffer::new(30, 30, Vector3::zeros());
        let triangle = flat([point![10.0, 10.0, 1.5], point![20.0, 10.0, 1.5], point![10.0, 20.0, 1.5]]);
        assert_eq!(draw_triangle(&mut buffer, &triangle, &FlatShader, &params()).unwrap(), 0);
    }

    #[test]
    fn wide_setup_agrees_with_exact_setup() {
        let triangles = [
            [point![2.0, 3.0, 0.0], point![15.5, 4.0, 0.0], point![6.0, 14.0, 0.0]],
            [point![0.0, 0.0, 0.0], point![4.0, 4.0, 0.0], point![0.0, 4.0, 0.0]],
            [point![5.5, 0.5, 0.0], point![9.5, 9.5, 0.0], point![5.5, 9.5, 0.0]],
            [point![-7.3, 2.2, 0.0], point![18.9, -4.1, 0.0], point![11.6, 23.7, 0.0]],
        ];
        for points in triangles.iter() {
            let exact = TriangleSetup::new(points).unwrap();
            let wide = WideTriangleSetup::new(points).unwrap();
            assert_eq!(exact.pixel_bounds(20, 20), wide.pixel_bounds(20, 20));
            for y in 0..20 {
                for x in 0..20 {
                    match (exact.barycentric(x, y), wide.barycentric(x, y)) {
                        (Some(a), Some(b)) => assert!((a - b).norm() < 1e-6, "pixel ({}, {})", x, y),
                        (None, None) => {}
                        _ => panic!("coverage differs at pixel ({}, {})", x, y),
                    }
                }
            }
        }
    }

    #[test]
    fn triangle_past_guard_band_is_still_drawn() {
        let screen = [point![-3.2e6, 5.0, 0.5], point![25.0, 5.0, 0.5], point![25.0, 25.0, 0.5]];
        assert!(TriangleSetup::new(&screen).is_none());

        let mut buffer = ScreenBuffer::new(30, 30, Vector3::zeros());
        let written = draw_triangle(&mut buffer, &flat(screen), &FlatShader, &params()).unwrap();
        assert!(written > 0);
        assert_eq!(*buffer.z(10).unwrap().get(0).unwrap(), 0.5);
        assert_eq!(*buffer.z(10).unwrap().get(20).unwrap(), 0.5);
        assert_eq!(*buffer.z(10).unwrap().get(27).unwrap(), f32::INFINITY);
        assert_eq!(*buffer.z(2).unwrap().get(10).unwrap(), f32::INFINITY);

        let far = [point![-3.2e6, 5.0, 0.5], point![f32::INFINITY, 5.0, 0.5], point![25.0, 25.0, 0.5]];
        assert_eq!(draw_triangle(&mut buffer, &flat(far), &FlatShader, &params()).unwrap(), 0);
    }

    #[test]
    fn bad_indices_are_rejected_before_drawing() {
        let mut buffer = ScreenBuffer::new(30, 30, Vector3::zeros());
        let screen = [point![10.0, 10.0, 0.5], point![20.0, 10.0, 0.5], point![10.0, 20.0, 0.5]];
        let world = [point![0.0, 0.0, 0.0], point![1.0, 0.0, 0.0], point![0.0, 1.0, 0.0]];

        let result = draw_triangles(&mut buffer, &[0, 1, 5], &screen, &world, None, &FlatShader, &params());
        assert_eq!(result, Err(RenderError::VertexOutOfRange { index: 5, count: 3 }));

        let result = draw_triangles(&mut buffer, &[0, 1, 2], &screen, &world[..2], None, &FlatShader, &params());
        assert_eq!(result, Err(RenderError::VertexOutOfRange { index: 2, count: 2 }));

        let normals = [Vector3::z(), Vector3::z()];
        let result = draw_triangles(&mut buffer, &[0, 1, 2], &screen, &world, Some(&normals[..]), &FlatShader, &params());
        assert_eq!(result, Err(RenderError::NormalCountMismatch { normals: 2, vertices: 3 }));

        assert_eq!(*buffer.z(11).unwrap().get(11).unwrap(), f32::INFINITY);
    }
}
