//! Headless capture sessions on a wgpu device.

use highres_core::{CaptureOptions, CaptureSession, ImageSink};
use highres_render::{Camera, HeadlessEngine, Scene};
use pollster::FutureExt;

use crate::Result;

/// Creates a wgpu engine with a `width` x `height` viewport and wraps it in a
/// capture session.
///
/// # Example
/// ```no_run
/// use highres::*;
///
/// let session = headless_session(
///     800,
///     600,
///     Scene::default(),
///     Camera::new(800.0 / 600.0),
///     FileSink::new("captures"),
///     CaptureOptions::default(),
/// )
/// .unwrap();
/// let image = pollster::block_on(session.capture(CaptureRequest::color(2))).unwrap();
/// ```
pub fn headless_session<S: ImageSink>(
    width: u32,
    height: u32,
    scene: Scene,
    camera: Camera,
    sink: S,
    options: CaptureOptions,
) -> Result<CaptureSession<HeadlessEngine, S>> {
    let engine = HeadlessEngine::new(width, height).block_on()?;
    Ok(CaptureSession::new(engine, scene, camera, sink, options)?)
}
