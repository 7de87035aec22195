//! Render configuration, read from a RON file. Every field is optional, missing ones take
//! the defaults below.

use std::fs;
use std::path::Path;

use nalgebra as na;
use na::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::scene::camera::{Camera, Projection};
use crate::scene::culling::NdcBounds;
use crate::scene::shader::{Lighting, Shading};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        return Self {
            position: [390.0, 0.0, 0.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
        };
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub fovy: f32, // Degrees.
    pub near: f32,
    pub far: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        return Self { fovy: 90.0, near: 0.1, far: 500.0 };
    }
}

/// Transform applied to the model once, right after loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub rotation_axis: [f32; 3],
    pub rotation_degrees: f32,
    pub scale: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        return Self {
            rotation_axis: [1.0, 0.0, 0.0],
            rotation_degrees: 90.0,
            scale: 1.0,
        };
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub workers: usize, // 0 runs the parallel stages on the render thread.
    pub blocks: usize,  // Blocks per parallel stage.
    pub background: [f32; 3],
    pub base_color: [f32; 3],
    pub ambient: f32,
    pub light_position: [f32; 3],
    pub backface_cull: bool,
    pub clip_cull: bool,
    pub ndc_cull: bool,
    pub ndc_bounds: NdcBounds,
    pub shading: Shading,
    pub camera: CameraConfig,
    pub projection: ProjectionConfig,
    pub model: ModelConfig,
    pub print_fps: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let lighting = Lighting::default();
        return Self {
            width: 1280,
            height: 720,
            workers: 12,
            blocks: 8,
            background: [0.7, 0.7, 0.7],
            base_color: lighting.base_color.into(),
            ambient: lighting.ambient,
            light_position: lighting.light_position.coords.into(),
            backface_cull: true,
            clip_cull: true,
            ndc_cull: false,
            ndc_bounds: NdcBounds::Inclusive,
            shading: Shading::Flat,
            camera: CameraConfig::default(),
            projection: ProjectionConfig::default(),
            model: ModelConfig::default(),
            print_fps: false,
        };
    }
}

impl RenderConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let contents = fs::read_to_string(path)?;
        return Self::from_ron_str(&contents);
    }

    pub fn from_ron_str(s: &str) -> Result<Self, LoadError> {
        let config: RenderConfig = ron::from_str(s)?;
        return Ok(config);
    }

    pub fn aspect(&self) -> f32 {
        return self.width as f32 / self.height.max(1) as f32;
    }

    pub fn camera(&self) -> Camera {
        return Camera::look_at(
            Point3::from(self.camera.position),
            Point3::from(self.camera.target),
            Vector3::from(self.camera.up),
        );
    }

    pub fn projection(&self) -> Projection {
        let p = &self.projection;
        return Projection::new(p.fovy, self.aspect(), p.near, p.far);
    }
}
