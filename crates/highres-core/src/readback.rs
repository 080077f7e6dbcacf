//! Color read-back: render into an off-screen target and copy its pixels out.

use thiserror::Error;

use crate::error::{CaptureError, Result};
use crate::renderer::{CaptureRenderer, TargetOptions};
use crate::sizing::CaptureDimensions;

/// A pixel buffer whose length does not match its dimensions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("pixel buffer of {width}x{height} needs {expected} bytes, got {actual}")]
pub struct BufferSizeError {
    pub width: u32,
    pub height: u32,
    pub expected: usize,
    pub actual: usize,
}

/// Raw RGBA8 pixels in GPU read-back order (row 0 is the bottom scanline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps `data`, which must hold exactly `width * height * 4` bytes.
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> std::result::Result<Self, BufferSizeError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(BufferSizeError {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Buffer produced by flipping an image whose size already matched.
    pub(crate) fn from_flipped(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of one scanline.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// Scanline `row`, counted from the bottom.
    pub fn row(&self, row: u32) -> &[u8] {
        let stride = self.stride();
        let start = row as usize * stride;
        &self.data[start..start + stride]
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Render targets owned by the capture in flight.
///
/// Every target allocated during a capture is tracked here and released in one
/// place when the session returns to idle, whether the capture succeeded or not.
pub struct ActiveTargets<T> {
    targets: Vec<T>,
}

impl<T> ActiveTargets<T> {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
        }
    }

    /// Takes ownership of `target` and returns its index.
    pub fn track(&mut self, target: T) -> usize {
        self.targets.push(target);
        self.targets.len() - 1
    }

    pub fn get(&self, index: usize) -> &T {
        &self.targets[index]
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Disposes every tracked target through `renderer`.
    pub fn dispose_all<R>(&mut self, renderer: &mut R)
    where
        R: CaptureRenderer<Target = T>,
    {
        let count = self.targets.len();
        for target in self.targets.drain(..) {
            renderer.dispose_target(target);
        }
        if count > 0 {
            log::debug!("Disposed {count} capture target(s)");
        }
    }
}

impl<T> Default for ActiveTargets<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocates a tracked target of `dims`.
pub(crate) fn allocate_target<R: CaptureRenderer>(
    renderer: &mut R,
    dims: &CaptureDimensions,
    options: &TargetOptions,
    targets: &mut ActiveTargets<R::Target>,
) -> Result<usize> {
    let target = renderer
        .create_render_target(dims.width, dims.height, options)
        .map_err(CaptureError::readback)?;
    log::debug!(
        "Allocated {}x{} capture target ({:?})",
        dims.width,
        dims.height,
        options.depth
    );
    Ok(targets.track(target))
}

/// Reads the full area of a tracked target and checks the buffer size.
pub(crate) fn read_full<R: CaptureRenderer>(
    renderer: &mut R,
    target: &R::Target,
    dims: &CaptureDimensions,
) -> Result<PixelBuffer> {
    let buffer = renderer
        .read_pixels(target, 0, 0, dims.width, dims.height)
        .map_err(CaptureError::readback)?;
    if buffer.width() != dims.width || buffer.height() != dims.height {
        return Err(CaptureError::readback(format!(
            "read back {}x{} pixels, expected {}x{}",
            buffer.width(),
            buffer.height(),
            dims.width,
            dims.height
        )));
    }
    Ok(buffer)
}

/// Renders `scene` once into a fresh color target and reads it back.
///
/// The target stays in `targets` for the session to dispose. Collaborator errors
/// are surfaced as [`CaptureError::ReadbackFailure`] and never retried.
pub fn render_color<R: CaptureRenderer>(
    renderer: &mut R,
    scene: &R::Scene,
    camera: &R::Camera,
    dims: &CaptureDimensions,
    targets: &mut ActiveTargets<R::Target>,
) -> Result<PixelBuffer> {
    let index = allocate_target(renderer, dims, &TargetOptions::color(), targets)?;
    let target = targets.get(index);
    renderer
        .render_into(scene, camera, target)
        .map_err(CaptureError::readback)?;
    read_full(renderer, target, dims)
}
