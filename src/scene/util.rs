use nalgebra as na;
use na::{matrix, vector, Matrix4, Point3, Vector3, Vector4};

/// Transformation of a point to homogenous coordinates.
pub fn to_hom_point(v: &Point3<f32>) -> Vector4<f32> {
    return vector![v.x, v.y, v.z, 1.0];
}

/// Transformation of a vector to homogenous coordinates.
pub fn to_hom_vector(v: &Vector3<f32>) -> Vector4<f32> {
    return vector![v.x, v.y, v.z, 0.0];
}

/// Perspective divide. Returns None for w == 0, the caller decides what to do with such a point.
pub fn from_hom_point(v: &Vector4<f32>) -> Option<Point3<f32>> {
    if v.w == 0.0 {
        return None;
    }
    let rw = 1.0 / v.w;
    return Some(Point3::new(v.x * rw, v.y * rw, v.z * rw));
}

/// Normalization, which refuses to divide by a zero length.
pub fn try_normalize(v: &Vector3<f32>) -> Option<Vector3<f32>> {
    return v.try_normalize(f32::EPSILON);
}

/// Viewport matrix mapping NDC to pixel coordinates, with row 0 at the top of the image.
/// x: [-1, 1] -> [x0, x0 + width], y: [1, -1] -> [y0, y0 + height], z: [-1, 1] -> [0, 1].
pub fn viewport_matrix(x0: f32, y0: f32, width: f32, height: f32) -> Matrix4<f32> {
    let w = width / 2.0;
    let h = height / 2.0;
    return matrix![w,   0.0, 0.0, x0 + w;
                   0.0, -h,  0.0, y0 + h;
                   0.0, 0.0, 0.5, 0.5;
                   0.0, 0.0, 0.0, 1.0];
}

/// Utility for getting convex combination of 2 colors: t * c_1 + (1 - t) * c_2.
/// t is unrestricted.
pub fn color_blend(color_1: Vector3<f32>, color_2: Vector3<f32>, t: f32) -> Vector3<f32> {
    return color_1 * t + color_2 * (1.0 - t);
}
