//! Per-frame rendering pipeline.
//!
//! transform (parallel) -> backface cull -> clip cull -> perspective divide -> NDC cull
//! -> viewport map (parallel) -> rasterize (sequential, render thread only).

pub mod buffer;
pub mod camera;
pub mod culling;
pub mod model;
pub mod parallel;
pub mod raster;
pub mod shader;
pub mod util;

use std::sync::Arc;

use nalgebra as na;
use na::{Matrix4, Point3, Vector3, Vector4};

use crate::config::RenderConfig;
use crate::error::RenderError;
use buffer::ScreenBuffer;
use camera::{Camera, Projection};
use culling::{backface_cull, clip_cull, ndc_cull, perspective_divide, NdcBounds, MIN_CLIP_W};
use model::{validate_indices, Mesh, Model};
use parallel::ParallelStage;
use raster::draw_triangles;
use shader::{DrawParams, FlatShader, Lighting, Shader};
use util::{to_hom_point, to_hom_vector, viewport_matrix};

/// Output of the transform stage for one source vertex.
#[derive(Debug, Clone, Copy)]
pub struct TransformedVertex {
    pub world: Point3<f32>,
    pub clip: Vector4<f32>,   // Pre-divide.
    pub normal: Vector3<f32>, // World space, zero when the mesh has no normals.
}

/// Switches and lighting shared by every frame.
#[derive(Debug, Clone, Copy)]
pub struct SceneSettings {
    pub backface_cull: bool,
    pub clip_cull: bool,
    pub ndc_cull: bool,
    pub ndc_bounds: NdcBounds,
    pub lighting: Lighting,
}

impl Default for SceneSettings {
    fn default() -> Self {
        return Self {
            backface_cull: true,
            clip_cull: true,
            ndc_cull: false,
            ndc_bounds: NdcBounds::Inclusive,
            lighting: Lighting::default(),
        };
    }
}

/// What happened to the geometry during one frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub triangles: usize,      // Submitted.
    pub after_backface: usize,
    pub after_clip: usize,
    pub after_ndc: usize,
    pub divided: usize,        // Vertices that went through the perspective divide.
    pub pixels: usize,         // Fragments that passed the depth test and were written.
}

/// Owns the render target and everything needed to turn a model into pixels.
pub struct Scene {
    buffer: ScreenBuffer,
    stage: ParallelStage,
    viewport: Matrix4<f32>,
    shader: Arc<dyn Shader>,
    pub settings: SceneSettings,
}

impl Scene {
    /// Scene with a flat shader and default settings, parallel stages split into `blocks`.
    pub fn new(width: usize, height: usize, background: Vector3<f32>, workers: usize, blocks: usize) -> Scene {
        return Scene {
            buffer: ScreenBuffer::new(width, height, background),
            stage: ParallelStage::new(workers, blocks),
            viewport: viewport_matrix(0.0, 0.0, width as f32, height as f32),
            shader: Arc::new(FlatShader),
            settings: SceneSettings::default(),
        };
    }

    pub fn from_config(config: &RenderConfig) -> Scene {
        let mut scene = Scene::new(
            config.width,
            config.height,
            Vector3::from(config.background),
            config.workers,
            config.blocks,
        );
        scene.shader = config.shading.shader();
        scene.settings = SceneSettings {
            backface_cull: config.backface_cull,
            clip_cull: config.clip_cull,
            ndc_cull: config.ndc_cull,
            ndc_bounds: config.ndc_bounds,
            lighting: Lighting {
                light_position: Point3::from(config.light_position),
                base_color: Vector3::from(config.base_color),
                ambient: config.ambient,
            },
        };
        log::info!(
            "Scene {}x{}, {} workers, {} blocks",
            config.width,
            config.height,
            scene.stage.workers(),
            scene.stage.block_count()
        );
        return scene;
    }

    pub fn buffer(&self) -> &ScreenBuffer {
        return &self.buffer;
    }

    pub fn width(&self) -> usize {
        return self.buffer.width();
    }

    pub fn height(&self) -> usize {
        return self.buffer.height();
    }

    pub fn set_shader(&mut self, shader: Arc<dyn Shader>) {
        self.shader = shader;
    }

    /// Overrides the viewport, by default it covers the whole buffer.
    pub fn set_viewport(&mut self, x0: f32, y0: f32, width: f32, height: f32) {
        self.viewport = viewport_matrix(x0, y0, width, height);
    }

    /// Reallocates the render target and resets the viewport to cover it.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.buffer.resize(width, height);
        self.viewport = viewport_matrix(0.0, 0.0, width as f32, height as f32);
        log::info!("Resized render target to {}x{}", width, height);
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Draws one frame from scratch. On error the buffer is left cleared, so a failed frame
    /// never shows partial output.
    pub fn render(
        &mut self,
        model: &Model,
        camera: &Camera,
        projection: &Projection,
    ) -> Result<FrameStats, RenderError> {
        self.buffer.clear();
        match self.draw(model, camera, projection) {
            Ok(stats) => {
                log::debug!("{:?}", stats);
                return Ok(stats);
            }
            Err(err) => {
                self.buffer.clear();
                log::warn!("Frame abandoned: {}", err);
                return Err(err);
            }
        }
    }

    fn draw_params(&self, model: &Model, camera: &Camera, projection: &Projection) -> DrawParams {
        let mut params = DrawParams::new(
            model.matrix(),
            camera.view_matrix(),
            projection.matrix(),
            camera.position,
        );
        params.lighting = self.settings.lighting;
        return params;
    }

    fn draw(&mut self, model: &Model, camera: &Camera, projection: &Projection) -> Result<FrameStats, RenderError> {
        if self.buffer.size() == 0 {
            return Err(RenderError::EmptyScreen);
        }
        let mesh = model.mesh();
        validate_indices(mesh.indices(), mesh.vertex_count())?;

        let params = self.draw_params(model, camera, projection);
        let vertices = self.transform(mesh, &params)?;
        let world: Vec<Point3<f32>> = vertices.iter().map(|v| v.world).collect();
        let clip: Vec<Vector4<f32>> = vertices.iter().map(|v| v.clip).collect();

        let mut stats = FrameStats {
            triangles: mesh.triangle_count(),
            ..FrameStats::default()
        };

        let mut indices = mesh.indices().to_vec();
        if self.settings.backface_cull {
            indices = backface_cull(&indices, &world, &camera.position);
        }
        stats.after_backface = indices.len() / 3;

        if self.settings.clip_cull {
            indices = clip_cull(&indices, &clip);
        } else {
            // The divide below still needs a usable w.
            indices = indices
                .chunks_exact(3)
                .filter(|tri| tri.iter().all(|&i| clip[i as usize].w > MIN_CLIP_W))
                .flatten()
                .copied()
                .collect();
        }
        stats.after_clip = indices.len() / 3;

        let divided = perspective_divide(&indices, &clip);
        stats.divided = divided.count;

        if self.settings.ndc_cull {
            indices = ndc_cull(&indices, &divided.ndc, self.settings.ndc_bounds);
        }
        stats.after_ndc = indices.len() / 3;

        let screen = self.viewport_map(Arc::new(divided.ndc))?;
        let normals = match mesh.has_normals() {
            true => Some(vertices.iter().map(|v| v.normal).collect::<Vec<Vector3<f32>>>()),
            false => None,
        };

        stats.pixels = draw_triangles(
            &mut self.buffer,
            &indices,
            &screen,
            &world,
            normals.as_deref(),
            self.shader.as_ref(),
            &params,
        )?;
        return Ok(stats);
    }

    /// Runs the vertex stage of the current shader over every vertex of the mesh.
    pub fn transform(&self, mesh: &Mesh, params: &DrawParams) -> Result<Vec<TransformedVertex>, RenderError> {
        let shader = Arc::clone(&self.shader);
        let normals = Arc::clone(mesh.normals());
        let params = *params;
        let f = Arc::new(move |i: usize, position: &Point3<f32>| {
            let world = (params.model_matrix * to_hom_point(position)).xyz();
            let normal = match normals.get(i) {
                Some(n) => (params.normal_matrix * to_hom_vector(n))
                    .xyz()
                    .try_normalize(f32::EPSILON)
                    .unwrap_or(Vector3::zeros()),
                None => Vector3::zeros(),
            };
            return TransformedVertex {
                world: Point3::from(world),
                clip: shader.vertex(position, &params),
                normal,
            };
        });
        return self.stage.map(mesh.positions(), f);
    }

    /// NDC to screen space, x and y in pixels and depth in [0, 1].
    pub fn viewport_map(&self, ndc: Arc<Vec<Point3<f32>>>) -> Result<Vec<Point3<f32>>, RenderError> {
        let viewport = self.viewport;
        let f = Arc::new(move |_: usize, p: &Point3<f32>| Point3::from((viewport * to_hom_point(p)).xyz()));
        return self.stage.map(&ndc, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::{point, vector};

    fn quad() -> Model {
        let positions = vec![
            point![-1.0, -1.0, 0.0],
            point![1.0, -1.0, 0.0],
            point![1.0, 1.0, 0.0],
            point![-1.0, 1.0, 0.0],
        ];
        let mesh = Mesh::new(positions, Vec::new(), vec![0, 1, 2, 0, 2, 3]).unwrap();
        return Model::new(mesh);
    }

    fn view() -> (Camera, Projection) {
        let camera = Camera::look_at(point![0.0, 0.0, 5.0], Point3::origin(), Vector3::y());
        return (camera, Projection::new(90.0, 1.0, 0.1, 100.0));
    }

    #[test]
    fn quad_facing_camera_is_drawn() {
        let mut scene = Scene::new(40, 40, Vector3::zeros(), 0, 4);
        let (camera, projection) = view();
        let stats = scene.render(&quad(), &camera, &projection).unwrap();
        assert_eq!(stats.triangles, 2);
        assert_eq!(stats.after_backface, 2);
        assert_eq!(stats.after_clip, 2);
        assert_eq!(stats.divided, 4);
        assert!(stats.pixels > 0);
        assert!(scene.buffer().z(20).unwrap().get(20).unwrap().is_finite());
    }

    #[test]
    fn quad_seen_from_behind_is_culled() {
        let mut scene = Scene::new(40, 40, Vector3::zeros(), 0, 4);
        let camera = Camera::look_at(point![0.0, 0.0, -5.0], Point3::origin(), Vector3::y());
        let stats = scene.render(&quad(), &camera, &Projection::new(90.0, 1.0, 0.1, 100.0)).unwrap();
        assert_eq!(stats.after_backface, 0);
        assert_eq!(stats.divided, 0);
        assert_eq!(stats.pixels, 0);
    }

    #[test]
    fn empty_screen_aborts_frame() {
        let mut scene = Scene::new(0, 10, Vector3::zeros(), 0, 4);
        let (camera, projection) = view();
        assert_eq!(scene.render(&quad(), &camera, &projection), Err(RenderError::EmptyScreen));
    }

    #[test]
    fn transform_moves_normals_to_world_space() {
        let mesh = Mesh::new(
            vec![point![0.0, 0.0, 0.0], point![1.0, 0.0, 0.0], point![0.0, 1.0, 0.0]],
            vec![Vector3::z(), Vector3::z(), Vector3::z()],
            vec![0, 1, 2],
        )
        .unwrap();
        let mut model = Model::new(mesh);
        model.translate(vector![0.0, 0.0, 2.0]);
        model.rotate(Vector3::x(), std::f32::consts::FRAC_PI_2);

        let scene = Scene::new(10, 10, Vector3::zeros(), 2, 2);
        let (camera, projection) = view();
        let params = DrawParams::new(model.matrix(), camera.view_matrix(), projection.matrix(), camera.position);
        let vertices = scene.transform(model.mesh(), &params).unwrap();

        assert_eq!(vertices.len(), 3);
        assert!((vertices[2].world - point![0.0, 0.0, 3.0]).norm() < 1e-5);
        assert!((vertices[0].normal - vector![0.0, -1.0, 0.0]).norm() < 1e-5);
    }

    #[test]
    fn resize_resets_viewport() {
        let mut scene = Scene::new(10, 10, Vector3::zeros(), 0, 1);
        scene.resize(40, 20);
        let screen = scene.viewport_map(Arc::new(vec![point![1.0, -1.0, 1.0]])).unwrap();
        assert_eq!(screen[0], point![40.0, 20.0, 1.0]);
    }
}
