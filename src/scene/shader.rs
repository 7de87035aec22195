//! Shading strategies.
//!
//! The rasterizer only knows the two capabilities of the `Shader` trait: move a model-space
//! position to clip space and color a fragment. Everything a shader needs for a draw call
//! travels in `DrawParams`, there is no state shared behind the rasterizer's back.

use std::sync::Arc;

use nalgebra as na;
use na::{vector, Matrix4, Point3, Vector3, Vector4};
use serde::{Deserialize, Serialize};

use super::util::{color_blend, to_hom_point};

/// Point light and surface color used by the built-in shaders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub light_position: Point3<f32>, // Point light in world space.
    pub base_color: Vector3<f32>,
    pub ambient: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        return Self {
            light_position: Point3::new(0.0, 300.0, 0.0),
            base_color: vector![0.9, 0.9, 0.9],
            ambient: 0.1,
        };
    }
}

/// Per-draw-call uniforms.
#[derive(Debug, Clone, Copy)]
pub struct DrawParams {
    pub model_matrix: Matrix4<f32>,
    pub mvp_matrix: Matrix4<f32>,    // projection * view * model.
    pub normal_matrix: Matrix4<f32>, // Inverse transpose of the model matrix, applied to normals.
    pub camera_position: Point3<f32>,
    pub lighting: Lighting,
}

impl DrawParams {
    pub fn new(
        model_matrix: Matrix4<f32>,
        view_matrix: Matrix4<f32>,
        projection_matrix: Matrix4<f32>,
        camera_position: Point3<f32>,
    ) -> Self {
        // Non invertible model matrices only happen with a zero scale, any normal works there.
        let normal_matrix = model_matrix
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or_else(Matrix4::identity);
        return Self {
            model_matrix,
            mvp_matrix: projection_matrix * view_matrix * model_matrix,
            normal_matrix,
            camera_position,
            lighting: Lighting::default(),
        };
    }
}

/// Attributes of a single fragment, interpolated affinely in screen space.
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub x: usize,
    pub y: usize,
    pub depth: f32,
    pub barycentric: Vector3<f32>,
    pub world_position: Point3<f32>, // Interpolated world position.
    pub centroid: Point3<f32>,       // World position of the triangle centroid.
    pub face_normal: Vector3<f32>,   // Unit geometric normal in world space.
    pub normal: Vector3<f32>,        // Interpolated vertex normal, face normal if the mesh has none.
}

pub trait Shader: Send + Sync {
    /// Model-space position to clip space.
    fn vertex(&self, position: &Point3<f32>, params: &DrawParams) -> Vector4<f32> {
        return params.mvp_matrix * to_hom_point(position);
    }

    /// Color of the fragment, None discards it.
    fn fragment(&self, fragment: &Fragment, params: &DrawParams) -> Option<Vector3<f32>>;
}

/// Lambert factor of a point light, clamped to [0, 1].
fn lambert(position: &Point3<f32>, normal: &Vector3<f32>, light_position: &Point3<f32>) -> f32 {
    let light_dir = match (light_position - position).try_normalize(f32::EPSILON) {
        Some(dir) => dir,
        None => return 1.0, // Light sits on the surface.
    };
    return light_dir.dot(normal).clamp(0.0, 1.0);
}

fn lit_color(params: &DrawParams, intensity: f32) -> Vector3<f32> {
    let lighting = &params.lighting;
    let light = lighting.ambient + (1.0 - lighting.ambient) * intensity;
    return color_blend(lighting.base_color, Vector3::zeros(), light);
}

/// One intensity per triangle, taken at its centroid with the geometric normal.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatShader;

impl Shader for FlatShader {
    fn fragment(&self, fragment: &Fragment, params: &DrawParams) -> Option<Vector3<f32>> {
        let intensity = lambert(&fragment.centroid, &fragment.face_normal, &params.lighting.light_position);
        return Some(lit_color(params, intensity));
    }
}

/// Per-pixel Lambert with interpolated vertex normals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmoothShader;

impl Shader for SmoothShader {
    fn fragment(&self, fragment: &Fragment, params: &DrawParams) -> Option<Vector3<f32>> {
        let intensity = lambert(&fragment.world_position, &fragment.normal, &params.lighting.light_position);
        return Some(lit_color(params, intensity));
    }
}

/// Shading model selectable from the config file and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shading {
    Flat,
    Smooth,
}

impl Shading {
    pub fn from_name(name: &str) -> Option<Shading> {
        match name {
            "flat" => Some(Shading::Flat),
            "smooth" => Some(Shading::Smooth),
            _ => None,
        }
    }

    pub fn shader(&self) -> Arc<dyn Shader> {
        match self {
            Shading::Flat => Arc::new(FlatShader),
            Shading::Smooth => Arc::new(SmoothShader),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::point;

    fn params() -> DrawParams {
        let mut params = DrawParams::new(
            Matrix4::identity(),
            Matrix4::identity(),
            Matrix4::identity(),
            point![0.0, 0.0, 5.0],
        );
        params.lighting = Lighting {
            light_position: point![0.0, 0.0, 10.0],
            base_color: vector![1.0, 0.5, 0.0],
            ambient: 0.0,
        };
        return params;
    }

    fn fragment(normal: Vector3<f32>) -> Fragment {
        return Fragment {
            x: 0,
            y: 0,
            depth: 0.5,
            barycentric: vector![1.0, 0.0, 0.0],
            world_position: point![0.0, 0.0, 0.0],
            centroid: point![0.0, 0.0, 0.0],
            face_normal: normal,
            normal,
        };
    }

    #[test]
    fn surface_facing_the_light_is_fully_lit() {
        let color = FlatShader.fragment(&fragment(Vector3::z()), &params()).unwrap();
        assert!((color - vector![1.0, 0.5, 0.0]).norm() < 1e-6);
    }

    #[test]
    fn surface_facing_away_is_clamped_to_ambient() {
        let mut params = params();
        params.lighting.ambient = 0.25;
        let color = SmoothShader.fragment(&fragment(-Vector3::z()), &params).unwrap();
        assert!((color - vector![0.25, 0.125, 0.0]).norm() < 1e-6);
    }

    #[test]
    fn default_vertex_stage_applies_mvp() {
        let mut params = params();
        params.mvp_matrix = Matrix4::new_translation(&vector![1.0, 2.0, 3.0]);
        let clip = FlatShader.vertex(&point![0.0, 0.0, 0.0], &params);
        assert_eq!(clip, vector![1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn shading_names() {
        assert_eq!(Shading::from_name("flat"), Some(Shading::Flat));
        assert_eq!(Shading::from_name("smooth"), Some(Shading::Smooth));
        assert_eq!(Shading::from_name("phong"), None);
    }
}
