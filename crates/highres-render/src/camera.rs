//! Camera and view management.

use glam::{Mat4, Vec3};
use highres_core::CaptureCamera;

/// GPU representation of camera uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniforms {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

/// A perspective camera looking at a target point.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl Camera {
    /// Creates a new camera with default settings.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect_ratio,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Sets the clipping planes.
    #[must_use]
    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Moves the camera to `position`, looking at `target`.
    #[must_use]
    pub fn looking_at(mut self, position: Vec3, target: Vec3) -> Self {
        self.position = position;
        self.target = target;
        self
    }

    /// Sets the aspect ratio.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix.
    ///
    /// Depth maps the near plane to 0 and the far plane to 1.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Returns the camera's forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Returns the uniforms for the current view.
    #[must_use]
    pub fn uniforms(&self) -> CameraUniforms {
        CameraUniforms {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}

impl CaptureCamera for Camera {
    fn near(&self) -> f32 {
        self.near
    }

    fn far(&self) -> f32 {
        self.far
    }

    fn aspect(&self) -> f32 {
        self.aspect_ratio
    }

    fn set_aspect(&mut self, aspect: f32) {
        self.set_aspect_ratio(aspect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;
    use highres_core::depth::DepthLinearization;

    fn device_depth(camera: &Camera, distance: f32) -> f32 {
        let point = camera.position + camera.forward() * distance;
        let clip = camera.view_projection_matrix() * Vec4::new(point.x, point.y, point.z, 1.0);
        clip.z / clip.w
    }

    #[test]
    fn test_camera_defaults() {
        let camera = Camera::default();
        assert_eq!(camera.target, Vec3::ZERO);
        assert!((camera.aspect_ratio - 16.0 / 9.0).abs() < 1e-6);
        assert!(camera.near < camera.far);
    }

    #[test]
    fn test_projection_depth_range() {
        let camera = Camera::new(1.0).with_clip_planes(0.5, 50.0);
        assert!(device_depth(&camera, 0.5).abs() < 1e-5);
        assert!((device_depth(&camera, 50.0) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_projection_matches_depth_linearization() {
        let camera = Camera::new(1.0).with_clip_planes(0.1, 100.0);
        let params = DepthLinearization::from_camera(&camera);
        for distance in [1.0, 10.0, 50.0, 90.0] {
            let expected = params.device_depth(distance);
            let actual = device_depth(&camera, distance);
            assert!(
                (expected - actual).abs() < 1e-4,
                "distance {distance}: {expected} vs {actual}"
            );
        }
    }

    #[test]
    fn test_set_aspect_through_capture_camera() {
        let mut camera = Camera::new(1.0);
        CaptureCamera::set_aspect(&mut camera, 2.5);
        assert!((camera.aspect() - 2.5).abs() < 1e-6);
        let proj = camera.projection_matrix();
        assert!((proj.x_axis.x * 2.5 - proj.y_axis.y).abs() < 1e-4);
    }
}
