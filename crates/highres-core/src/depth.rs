//! Depth projection: render the scene's depth and turn it into a grayscale map.
//!
//! Device depth is hyperbolic in view distance, so nearly all of its range is
//! spent close to the camera. The post-process stage undoes the perspective
//! mapping and writes view distance normalized to `[near, far]`, which spreads
//! gray levels evenly over the scene.

use crate::error::{CaptureError, Result};
use crate::readback::{allocate_target, read_full, ActiveTargets, PixelBuffer};
use crate::renderer::{CaptureCamera, CaptureRenderer, TargetOptions};
use crate::sizing::CaptureDimensions;

/// Clip planes used to linearize device depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthLinearization {
    pub near: f32,
    pub far: f32,
}

impl DepthLinearization {
    pub fn new(near: f32, far: f32) -> Self {
        Self { near, far }
    }

    /// Reads the clip planes of `camera`.
    pub fn from_camera(camera: &impl CaptureCamera) -> Self {
        Self::new(camera.near(), camera.far())
    }

    /// Linear depth in `[0, 1]` for a device depth sample.
    pub fn linearize(&self, device_depth: f32) -> f32 {
        linearize_depth(device_depth, self.near, self.far)
    }

    /// Device depth a perspective projection writes for a point `distance` in front of the camera.
    pub fn device_depth(&self, distance: f32) -> f32 {
        view_z_to_perspective_depth(-distance, self.near, self.far)
    }
}

/// Converts device depth in `[0, 1]` to view-space z (negative in front of the camera).
pub fn perspective_depth_to_view_z(device_depth: f32, near: f32, far: f32) -> f32 {
    (near * far) / ((far - near) * device_depth - far)
}

/// Maps view-space z to `[0, 1]` between the near and far planes.
pub fn view_z_to_orthographic_depth(view_z: f32, near: f32, far: f32) -> f32 {
    (view_z + near) / (near - far)
}

/// Inverse of [`perspective_depth_to_view_z`].
pub fn view_z_to_perspective_depth(view_z: f32, near: f32, far: f32) -> f32 {
    ((near + view_z) * far) / ((far - near) * view_z)
}

/// Linear depth in `[0, 1]` for a device depth sample.
pub fn linearize_depth(device_depth: f32, near: f32, far: f32) -> f32 {
    let view_z = perspective_depth_to_view_z(device_depth, near, far);
    view_z_to_orthographic_depth(view_z, near, far)
}

/// Quantizes a `[0, 1]` value to an opaque gray RGBA8 pixel.
pub fn depth_to_gray(linear: f32) -> [u8; 4] {
    let level = (linear.clamp(0.0, 1.0) * 255.0).round() as u8;
    [level, level, level, 255]
}

/// Renders linearized depth of `scene` and reads it back.
///
/// The first pass draws into a target with a 16-bit depth texture, the second
/// resolves that texture through the renderer's depth post-process into a
/// plain color target, which is then read like a color capture. Both targets
/// stay in `targets` for the session to dispose.
pub fn render_depth<R: CaptureRenderer>(
    renderer: &mut R,
    scene: &R::Scene,
    camera: &R::Camera,
    dims: &CaptureDimensions,
    targets: &mut ActiveTargets<R::Target>,
) -> Result<PixelBuffer> {
    let depth_index = allocate_target(renderer, dims, &TargetOptions::depth_capture(), targets)?;
    let output_index = allocate_target(renderer, dims, &TargetOptions::post_process(), targets)?;

    renderer
        .render_into(scene, camera, targets.get(depth_index))
        .map_err(CaptureError::readback)?;

    let params = DepthLinearization::from_camera(camera);
    renderer
        .post_process_depth(targets.get(depth_index), params, targets.get(output_index))
        .map_err(CaptureError::readback)?;

    read_full(renderer, targets.get(output_index), dims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEAR: f32 = 0.1;
    const FAR: f32 = 100.0;

    #[test]
    fn test_linearize_clip_planes() {
        // f32 cancellation in the far-plane denominator leaves an error near 1.5e-5.
        assert!(linearize_depth(0.0, NEAR, FAR).abs() < 1e-4);
        assert!((linearize_depth(1.0, NEAR, FAR) - 1.0).abs() < 1e-4);
        assert_eq!(depth_to_gray(linearize_depth(0.0, NEAR, FAR)), [0, 0, 0, 255]);
        assert_eq!(
            depth_to_gray(linearize_depth(1.0, NEAR, FAR)),
            [255, 255, 255, 255]
        );
    }

    #[test]
    fn test_device_depth_roundtrip() {
        let params = DepthLinearization::new(NEAR, FAR);
        for distance in [0.1_f32, 0.5, 1.0, 10.0, 50.0, 99.0] {
            let device = params.device_depth(distance);
            let view_z = perspective_depth_to_view_z(device, NEAR, FAR);
            assert!(
                (view_z + distance).abs() < distance * 1e-3,
                "distance {distance} came back as {}",
                -view_z
            );
        }
    }

    #[test]
    fn test_linear_depth_is_proportional_to_distance() {
        let params = DepthLinearization::new(NEAR, FAR);
        let mid = params.linearize(params.device_depth(50.05));
        assert!((mid - 0.5).abs() < 1e-3, "mid depth was {mid}");
    }

    #[test]
    fn test_raw_device_depth_is_clustered() {
        // Everything past 1 unit already sits in the top 10% of device depth.
        let params = DepthLinearization::new(NEAR, FAR);
        assert!(params.device_depth(1.0) > 0.9);
        assert!(params.linearize(params.device_depth(1.0)) < 0.01);
    }

    #[test]
    fn test_depth_to_gray() {
        assert_eq!(depth_to_gray(0.0), [0, 0, 0, 255]);
        assert_eq!(depth_to_gray(1.0), [255, 255, 255, 255]);
        assert_eq!(depth_to_gray(0.5), [128, 128, 128, 255]);
        assert_eq!(depth_to_gray(-0.2), [0, 0, 0, 255]);
        assert_eq!(depth_to_gray(3.0), [255, 255, 255, 255]);
    }
}
