use nalgebra as na;
use na::{Matrix4, Point3, Vector3};

const PITCH_LIMIT: f32 = 89.0;
const MIN_FOVY: f32 = 60.0;
const MAX_FOVY: f32 = 120.0;

/// Free-look camera. Position and basis are mutated by the input logic of the application,
/// the renderer only reads the view matrix and the eye position.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Point3<f32>,
    front: Vector3<f32>, // Unit view direction.
    up: Vector3<f32>,    // World up, used to rebuild the basis.
    yaw: f32,            // Degrees, around the world up.
    pitch: f32,          // Degrees, above the horizon.
}

/// Orthonormal pair spanning the plane perpendicular to `up`: the zero-yaw heading, then
/// the direction of +90 degrees of yaw. With y up these are +x and +z.
fn horizontal_basis(up: &Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
    let heading = (Vector3::x() - up * up.x)
        .try_normalize(1e-4)
        .or_else(|| (Vector3::z() - up * up.z).try_normalize(1e-4))
        .unwrap_or(Vector3::z());
    return (heading, heading.cross(up));
}

impl Camera {
    /// Camera at `position` looking at `target`. Falls back to looking down -z when the
    /// target coincides with the position.
    pub fn look_at(position: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) -> Self {
        let front = (target - position).try_normalize(f32::EPSILON).unwrap_or(-Vector3::z());
        let up = up.try_normalize(f32::EPSILON).unwrap_or(Vector3::y());
        let (heading, side) = horizontal_basis(&up);
        let pitch = front.dot(&up).clamp(-1.0, 1.0).asin().to_degrees();
        let yaw = front.dot(&side).atan2(front.dot(&heading)).to_degrees();
        return Self { position, front, up, yaw, pitch };
    }

    pub fn front(&self) -> Vector3<f32> {
        return self.front;
    }

    fn right(&self) -> Vector3<f32> {
        return self.front.cross(&self.up).try_normalize(f32::EPSILON).unwrap_or(Vector3::x());
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        return Matrix4::look_at_rh(&self.position, &(self.position + self.front), &self.up);
    }

    /// Turns the camera by the given angle deltas in degrees, pitch is clamped short of the poles.
    pub fn update_angles(&mut self, pitch: f32, yaw: f32) {
        self.pitch = (self.pitch + pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw += yaw;
        let (pitch, yaw) = (self.pitch.to_radians(), self.yaw.to_radians());
        let (heading, side) = horizontal_basis(&self.up);
        let front = heading * (yaw.cos() * pitch.cos()) + self.up * pitch.sin() + side * (yaw.sin() * pitch.cos());
        self.front = front.try_normalize(f32::EPSILON).unwrap_or(heading);
    }

    /// Moves the camera in its local frame: x is right, y is up, -z is forward.
    pub fn apply_move(&mut self, direction: Vector3<f32>, distance: f32) {
        let offset = self.right() * direction.x + self.up * direction.y - self.front * direction.z;
        if let Some(offset) = offset.try_normalize(f32::EPSILON) {
            self.position += offset * distance;
        }
    }
}

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub fovy: f32, // Degrees.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn new(fovy: f32, aspect: f32, near: f32, far: f32) -> Self {
        return Self { fovy, aspect, near, far };
    }

    /// OpenGL style projection, visible z lands in [-1, 1] after the divide.
    pub fn matrix(&self) -> Matrix4<f32> {
        return Matrix4::new_perspective(self.aspect, self.fovy.to_radians(), self.near, self.far);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.fovy = (self.fovy + delta).clamp(MIN_FOVY, MAX_FOVY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::{point, vector};

    #[test]
    fn looking_at_target_puts_it_on_the_view_axis() {
        let camera = Camera::look_at(point![0.0, 0.0, 5.0], point![0.0, 0.0, 0.0], Vector3::y());
        let p = camera.view_matrix().transform_point(&point![0.0, 0.0, 0.0]);
        assert!((p - point![0.0, 0.0, -5.0]).norm() < 1e-5);
    }

    #[test]
    fn forward_move_approaches_target() {
        let mut camera = Camera::look_at(point![0.0, 0.0, 5.0], point![0.0, 0.0, 0.0], Vector3::y());
        camera.apply_move(vector![0.0, 0.0, -1.0], 2.0);
        assert!((camera.position - point![0.0, 0.0, 3.0]).norm() < 1e-5);
        camera.apply_move(Vector3::zeros(), 2.0);
        assert!((camera.position - point![0.0, 0.0, 3.0]).norm() < 1e-5);
    }

    #[test]
    fn zero_angle_update_keeps_direction() {
        let mut camera = Camera::look_at(point![3.0, 1.0, 2.0], point![0.0, 0.0, 0.0], Vector3::y());
        let before = camera.front();
        camera.update_angles(0.0, 0.0);
        assert!((camera.front() - before).norm() < 1e-4);
        camera.update_angles(500.0, 0.0);
        assert!(camera.front().y < 1.0);
    }

    #[test]
    fn turning_follows_a_z_up_world() {
        let mut camera = Camera::look_at(point![0.0, 0.0, 0.0], point![1.0, 1.0, 0.5], Vector3::z());
        let before = camera.front();
        camera.update_angles(0.0, 0.0);
        assert!((camera.front() - before).norm() < 1e-4);

        // A quarter turn of yaw keeps the height above the xy plane.
        camera.update_angles(0.0, 90.0);
        assert!((camera.front().z - before.z).abs() < 1e-4);
        assert!(camera.front().dot(&before) < before.z * before.z + 1e-4);
    }

    #[test]
    fn projection_maps_near_and_far_planes() {
        let projection = Projection::new(90.0, 1.0, 1.0, 10.0);
        let m = projection.matrix();
        let near = m * vector![0.0, 0.0, -1.0, 1.0];
        let far = m * vector![0.0, 0.0, -10.0, 1.0];
        assert!((near.z / near.w + 1.0).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut projection = Projection::new(90.0, 1.0, 0.1, 100.0);
        projection.zoom(100.0);
        assert_eq!(projection.fovy, MAX_FOVY);
        projection.zoom(-100.0);
        assert_eq!(projection.fovy, MIN_FOVY);
    }
}
