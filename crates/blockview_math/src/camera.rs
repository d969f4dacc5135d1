use glam::{Mat4, Vec3};

use crate::Aabb;

/// Keeps the camera off the poles so `look_at` never degenerates.
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Orbit camera for the model preview.
///
/// The camera circles `target` at `distance`; `yaw` turns around the Y axis
/// and `pitch` lifts the eye above (positive) or below the target.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl OrbitCamera {
    /// Create a camera looking at the origin from the default three-quarter view.
    pub fn new(aspect: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: std::f32::consts::FRAC_PI_6,
            distance: 2.0,
            fov_y: 45.0_f32.to_radians(),
            aspect,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Eye position derived from target, angles and distance.
    pub fn position(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.distance
    }

    /// Get the view matrix (world → camera space)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Get the projection matrix (camera → clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get the combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio (e.g., on canvas resize)
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Rotate around the target. Pitch is clamped short of straight up/down.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Move towards (negative) or away from (positive) the target.
    pub fn dolly(&mut self, amount: f32) {
        let min = self.near * 2.0;
        self.distance = (self.distance + amount).max(min);
    }

    /// Point the camera at `bounds` from a distance that keeps it in view.
    ///
    /// Empty bounds leave the camera untouched.
    pub fn frame(&mut self, bounds: &Aabb) {
        if bounds.is_empty() {
            return;
        }
        let size = bounds.diagonal().max(1e-3);
        self.target = bounds.centroid();
        self.distance = size * 1.5;
        self.near = self.distance * 0.01;
        self.far = self.distance * 20.0;
    }
}

/// Camera uniform data for GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }

    pub fn from_camera(camera: &OrbitCamera) -> Self {
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view_is_above_target() {
        let camera = OrbitCamera::new(1.0);
        let eye = camera.position();

        assert!(eye.y > camera.target.y);
        assert!((eye.distance(camera.target) - camera.distance).abs() < 1e-4);
    }

    #[test]
    fn test_orbit_clamps_pitch() {
        let mut camera = OrbitCamera::new(1.0);
        camera.orbit(0.0, 10.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);

        camera.orbit(0.0, -20.0);
        assert!(camera.pitch > -std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_frame_centers_bounds() {
        let mut camera = OrbitCamera::new(1.0);
        let bounds = Aabb::from_points(Vec3::ZERO, Vec3::new(16.0, 16.0, 16.0));
        camera.frame(&bounds);

        assert_eq!(camera.target, Vec3::splat(8.0));
        assert!(camera.distance > bounds.diagonal());
        assert!(camera.near < camera.distance && camera.far > camera.distance);
    }

    #[test]
    fn test_frame_ignores_empty_bounds() {
        let mut camera = OrbitCamera::new(1.0);
        let before = camera.distance;
        camera.frame(&Aabb::EMPTY);
        assert_eq!(camera.distance, before);
    }

    #[test]
    fn test_dolly_never_crosses_target() {
        let mut camera = OrbitCamera::new(1.0);
        camera.dolly(-100.0);
        assert!(camera.distance > 0.0);
    }

    #[test]
    fn test_aspect_update() {
        let mut camera = OrbitCamera::new(1.0);
        camera.set_aspect(16.0 / 9.0);
        assert_eq!(camera.aspect, 16.0 / 9.0);

        camera.set_aspect(0.0);
        assert_eq!(camera.aspect, 16.0 / 9.0);
    }
}
