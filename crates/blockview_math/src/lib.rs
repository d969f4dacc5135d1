// Re-export glam for convenience
pub use glam::*;

// Blockview math types
mod aabb;
mod camera;
mod interval;

pub use aabb::Aabb;
pub use camera::{CameraUniform, OrbitCamera};
pub use interval::Interval;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::from_array([1.0, 2.0, 3.0]);
        assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_quat_rotation_is_right_handed() {
        let q = Quat::from_axis_angle(Vec3::Y, std::f32::consts::FRAC_PI_2);
        let r = q * Vec3::X;
        assert!((r - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }
}
