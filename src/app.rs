use std::path::PathBuf;
use std::time;

use anyhow::{anyhow, Context};
use nalgebra as na;
use na::{vector, Vector3};
use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};

use tiny_rasterizer::scene::camera::{Camera, Projection};
use tiny_rasterizer::scene::model::{Mesh, Model};
use tiny_rasterizer::{RenderConfig, Scene};

const CAMERA_SPEED: f32 = 200.0; // Units per second.
const ROTATION_SPEED: f32 = 45.0; // Degrees per second.
const ZOOM_STEP: f32 = 5.0;       // Degrees of fovy per key press.

/// Struct, defining execution context.
pub struct Params {
    pub config: RenderConfig,
    pub mesh_path: PathBuf,
    pub output: Option<PathBuf>, // Render a single frame into this file instead of opening a window.
    pub depth: bool,             // Show the depth plane instead of colors.
}

/// Keys currently held down. show-image only reports transitions.
#[derive(Debug, Default)]
struct HeldKeys {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    pitch_up: bool,
    pitch_down: bool,
    yaw_left: bool,
    yaw_right: bool,
}

/// One-shot actions triggered by a key release.
#[derive(Debug, Default)]
struct Actions {
    exit: bool,
    resize: bool,
    zoom: f32,
}

impl HeldKeys {
    fn set(&mut self, key: event::VirtualKeyCode, pressed: bool) {
        use event::VirtualKeyCode as Key;
        match key {
            Key::W => self.forward = pressed,
            Key::S => self.back = pressed,
            Key::A => self.left = pressed,
            Key::D => self.right = pressed,
            Key::Up => self.pitch_up = pressed,
            Key::Down => self.pitch_down = pressed,
            Key::Left => self.yaw_left = pressed,
            Key::Right => self.yaw_right = pressed,
            _ => (),
        }
    }

    /// Camera movement in its local frame, -z is forward.
    fn movement(&self) -> Vector3<f32> {
        let axis = |positive: bool, negative: bool| (positive as i32 - negative as i32) as f32;
        return vector![axis(self.right, self.left), 0.0, axis(self.back, self.forward)];
    }
}

/// Drains the window events piled up since the last frame.
fn poll_events(event_channel: &std::sync::mpsc::Receiver<event::WindowEvent>, keys: &mut HeldKeys) -> Actions {
    use event::VirtualKeyCode as Key;
    let mut actions = Actions::default();
    for window_event in event_channel.try_iter() {
        if let event::WindowEvent::KeyboardInput(event) = window_event {
            let key = match event.input.key_code {
                Some(key) => key,
                None => continue,
            };
            keys.set(key, event.input.state.is_pressed());
            if !event.input.state.is_released() {
                continue;
            }
            match key {
                Key::Escape => actions.exit = true,
                Key::R => actions.resize = true,
                Key::Equals | Key::NumpadAdd => actions.zoom -= ZOOM_STEP,
                Key::Minus | Key::NumpadSubtract => actions.zoom += ZOOM_STEP,
                _ => (),
            }
        }
    }
    return actions;
}

fn load_model(params: &Params) -> anyhow::Result<Model> {
    let mesh = Mesh::load_obj(&params.mesh_path)
        .with_context(|| format!("failed to load mesh {}", params.mesh_path.display()))?;
    let mut model = Model::new(mesh);
    let transform = &params.config.model;
    model.rotate(Vector3::from(transform.rotation_axis), transform.rotation_degrees.to_radians());
    model.scale(Vector3::repeat(transform.scale));
    return Ok(model);
}

fn frame_data(scene: &Scene, depth: bool) -> Vec<u8> {
    return match depth {
        true => scene.buffer().depth_image(),
        false => scene.buffer().as_rgb8(),
    };
}

/// Renders one frame and writes it to `params.output`.
pub fn render_to_file(params: Params) -> anyhow::Result<()> {
    let output = params.output.clone().ok_or_else(|| anyhow!("no output path given"))?;
    let model = load_model(&params)?;
    let mut scene = Scene::from_config(&params.config);

    let stats = scene.render(&model, &params.config.camera(), &params.config.projection())?;
    log::info!("Rendered {} of {} triangles, {} pixels", stats.after_ndc, stats.triangles, stats.pixels);

    let (width, height) = (scene.width() as u32, scene.height() as u32);
    let image = image::RgbImage::from_raw(width, height, frame_data(&scene, params.depth))
        .ok_or_else(|| anyhow!("frame does not match a {}x{} image", width, height))?;
    image.save(&output).with_context(|| format!("failed to save {}", output.display()))?;
    log::info!("Saved {}", output.display());
    return Ok(());
}

/// Actually launches the window, showing rendered frames until Escape is released.
pub fn run(params: Params) -> anyhow::Result<()> {
    let config = &params.config;
    let mut model = load_model(&params)?;
    let mut scene = Scene::from_config(config);
    let mut camera: Camera = config.camera();
    let mut projection: Projection = config.projection();

    // R toggles between these render target sizes.
    let sizes = [(config.width, config.height), ((config.width / 2).max(1), (config.height / 2).max(1))];
    let mut size_index = 0;

    let window_options: WindowOptions = WindowOptions {
        size: Some([config.width as u32, config.height as u32]),
        ..Default::default()
    };
    let window = create_window("output", window_options)?;
    let event_channel = window.event_channel()?;

    let mut keys = HeldKeys::default();
    let mut last_frame = time::Instant::now();
    let mut frame_counter_time_begin = time::Instant::now();
    let mut frame_counter: u32 = 0;
    loop {
        let actions = poll_events(&event_channel, &mut keys);
        if actions.exit {
            break;
        }
        if actions.resize {
            size_index = (size_index + 1) % sizes.len();
            let (width, height) = sizes[size_index];
            scene.resize(width, height);
            projection.aspect = width as f32 / height as f32;
        }
        if actions.zoom != 0.0 {
            projection.zoom(actions.zoom);
        }

        let now = time::Instant::now();
        let dt = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        camera.apply_move(keys.movement(), CAMERA_SPEED * dt);
        let angle = (ROTATION_SPEED * dt).to_radians();
        if keys.pitch_up { model.rotate(Vector3::x(), angle); }
        if keys.pitch_down { model.rotate(Vector3::x(), -angle); }
        if keys.yaw_left { model.rotate(Vector3::y(), angle); }
        if keys.yaw_right { model.rotate(Vector3::y(), -angle); }

        // A failed frame has already been logged, the window keeps the last good one.
        if scene.render(&model, &camera, &projection).is_ok() {
            let data = frame_data(&scene, params.depth);
            let image_data = ImageView::new(ImageInfo::rgb8(scene.width() as u32, scene.height() as u32), &data);
            window.set_image("image", image_data)?;
        }

        if config.print_fps {
            // Counting frames to print out stats every second.
            frame_counter += 1;
            if time::Instant::now().duration_since(frame_counter_time_begin).as_secs_f32() > 1.0 {
                log::info!("FPS --- {}", frame_counter);
                frame_counter_time_begin = time::Instant::now();
                frame_counter = 0;
            }
        }
    }

    return Ok(());
}
