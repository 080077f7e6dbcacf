//! CPU reference renderer.
//!
//! Draws scenes made of axis-aligned screen rectangles, each at a view distance,
//! with a real 16-bit depth buffer. It implements [`CaptureRenderer`] with the
//! same conventions a GPU backend follows (bottom-up read-back, hyperbolic
//! device depth), which makes it suitable for headless captures and tests.

use std::collections::HashMap;

use thiserror::Error;

use crate::depth::{depth_to_gray, DepthLinearization};
use crate::readback::{BufferSizeError, PixelBuffer};
use crate::renderer::{CaptureCamera, CaptureRenderer, DepthAttachment, TargetOptions, Viewport};

/// Errors raised by the software renderer.
#[derive(Error, Debug)]
pub enum SoftwareError {
    /// Simulated loss of the rendering context.
    #[error("rendering context lost")]
    ContextLost,

    /// The target handle does not refer to a live target.
    #[error("unknown render target {0}")]
    UnknownTarget(u64),

    /// Requested target exceeds the texture limit.
    #[error("render target {width}x{height} exceeds texture limit {max}")]
    TargetTooLarge { width: u32, height: u32, max: u32 },

    /// Read region lies outside the target.
    #[error("region {width}x{height} at ({x}, {y}) is outside the {target_width}x{target_height} target")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        target_width: u32,
        target_height: u32,
    },

    /// Depth post-processing needs a sampleable depth texture.
    #[error("render target {0} has no depth texture")]
    MissingDepthTexture(u64),

    /// Source and destination of a post-process differ in size.
    #[error("post-process targets differ in size")]
    SizeMismatch,

    /// Pixel buffer construction failed.
    #[error(transparent)]
    Buffer(#[from] BufferSizeError),
}

type SoftwareResult<T> = std::result::Result<T, SoftwareError>;

/// Camera for the software renderer. Only the clip planes affect output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftwareCamera {
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Default for SoftwareCamera {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
            aspect: 1.0,
        }
    }
}

impl SoftwareCamera {
    pub fn new(near: f32, far: f32) -> Self {
        Self {
            near,
            far,
            ..Self::default()
        }
    }
}

impl CaptureCamera for SoftwareCamera {
    fn near(&self) -> f32 {
        self.near
    }

    fn far(&self) -> f32 {
        self.far
    }

    fn aspect(&self) -> f32 {
        self.aspect
    }

    fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }
}

/// A flat rectangle facing the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftwareLayer {
    /// `[x0, y0, x1, y1]` in normalized screen space, origin top-left.
    pub rect: [f32; 4],
    /// Distance in front of the camera.
    pub distance: f32,
    /// RGBA color.
    pub color: [u8; 4],
}

/// A scene of layers over a solid background.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftwareScene {
    /// Clear color.
    pub background: [u8; 4],
    layers: Vec<SoftwareLayer>,
}

impl SoftwareScene {
    pub fn new(background: [u8; 4]) -> Self {
        Self {
            background,
            layers: Vec::new(),
        }
    }

    /// Adds a layer.
    pub fn add_layer(&mut self, rect: [f32; 4], distance: f32, color: [u8; 4]) {
        self.layers.push(SoftwareLayer {
            rect,
            distance,
            color,
        });
    }

    /// Adds a layer (builder form).
    pub fn with_layer(mut self, rect: [f32; 4], distance: f32, color: [u8; 4]) -> Self {
        self.add_layer(rect, distance, color);
        self
    }

    pub fn layers(&self) -> &[SoftwareLayer] {
        &self.layers
    }
}

/// Handle to a software render target.
#[derive(Debug, PartialEq, Eq)]
pub struct SoftwareTarget {
    id: u64,
    width: u32,
    height: u32,
}

impl SoftwareTarget {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Counters of renderer activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub viewport_changes: usize,
    pub targets_created: usize,
    pub targets_disposed: usize,
    pub render_passes: usize,
    pub readbacks: usize,
}

struct TargetStorage {
    width: u32,
    height: u32,
    options: TargetOptions,
    /// RGBA8, bottom-up.
    color: Vec<u8>,
    /// 16-bit device depth, bottom-up.
    depth: Option<Vec<u16>>,
}

/// CPU implementation of [`CaptureRenderer`].
pub struct SoftwareRenderer {
    viewport: Viewport,
    max_texture_size: u32,
    targets: HashMap<u64, TargetStorage>,
    next_id: u64,
    fail_readback: bool,
    fail_render: bool,
    stats: RendererStats,
}

impl SoftwareRenderer {
    /// Creates a renderer with a `width` x `height` viewport at pixel ratio 1.
    pub fn new(width: u32, height: u32, max_texture_size: u32) -> Self {
        Self {
            viewport: Viewport::new(width, height, 1.0),
            max_texture_size,
            targets: HashMap::new(),
            next_id: 0,
            fail_readback: false,
            fail_render: false,
            stats: RendererStats::default(),
        }
    }

    /// Sets the pixel ratio without counting it as a capture-driven change.
    pub fn with_pixel_ratio(mut self, ratio: f32) -> Self {
        self.viewport.pixel_ratio = ratio;
        self
    }

    /// Makes the next `read_pixels` call fail as if the context was lost.
    pub fn fail_next_readback(&mut self) {
        self.fail_readback = true;
    }

    /// Makes the next `render_into` call fail as if the context was lost.
    pub fn fail_next_render(&mut self) {
        self.fail_render = true;
    }

    /// Number of targets allocated and not yet disposed.
    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn stats(&self) -> RendererStats {
        self.stats
    }

    fn storage(&self, target: &SoftwareTarget) -> SoftwareResult<&TargetStorage> {
        self.targets
            .get(&target.id)
            .ok_or(SoftwareError::UnknownTarget(target.id))
    }

    fn storage_mut(&mut self, target: &SoftwareTarget) -> SoftwareResult<&mut TargetStorage> {
        self.targets
            .get_mut(&target.id)
            .ok_or(SoftwareError::UnknownTarget(target.id))
    }
}

/// Pixel range `[start, end)` whose centers fall inside `[lo, hi)` of a `size`-pixel axis.
fn covered_range(lo: f32, hi: f32, size: u32) -> (u32, u32) {
    let to_index = |v: f32| ((v.clamp(0.0, 1.0) * size as f32) - 0.5).ceil().max(0.0) as u32;
    (to_index(lo).min(size), to_index(hi).min(size))
}

fn quantize_depth(device_depth: f32) -> u16 {
    (device_depth.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16
}

impl CaptureRenderer for SoftwareRenderer {
    type Scene = SoftwareScene;
    type Camera = SoftwareCamera;
    type Target = SoftwareTarget;
    type Error = SoftwareError;

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.stats.viewport_changes += 1;
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.viewport.pixel_ratio = ratio;
        self.stats.viewport_changes += 1;
    }

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        options: &TargetOptions,
    ) -> SoftwareResult<SoftwareTarget> {
        if width > self.max_texture_size || height > self.max_texture_size {
            return Err(SoftwareError::TargetTooLarge {
                width,
                height,
                max: self.max_texture_size,
            });
        }
        let pixels = width as usize * height as usize;
        let depth = match options.depth {
            DepthAttachment::None => None,
            DepthAttachment::Buffer | DepthAttachment::Texture16 => Some(vec![u16::MAX; pixels]),
        };
        let id = self.next_id;
        self.next_id += 1;
        self.targets.insert(
            id,
            TargetStorage {
                width,
                height,
                options: *options,
                color: vec![0; pixels * 4],
                depth,
            },
        );
        self.stats.targets_created += 1;
        Ok(SoftwareTarget { id, width, height })
    }

    fn dispose_target(&mut self, target: SoftwareTarget) {
        if self.targets.remove(&target.id).is_some() {
            self.stats.targets_disposed += 1;
        }
    }

    fn render_into(
        &mut self,
        scene: &SoftwareScene,
        camera: &SoftwareCamera,
        target: &SoftwareTarget,
    ) -> SoftwareResult<()> {
        if std::mem::take(&mut self.fail_render) {
            return Err(SoftwareError::ContextLost);
        }
        let projection = DepthLinearization::from_camera(camera);
        let storage = self.storage_mut(target)?;
        let (width, height) = (storage.width, storage.height);

        for px in storage.color.chunks_exact_mut(4) {
            px.copy_from_slice(&scene.background);
        }
        if let Some(depth) = storage.depth.as_mut() {
            depth.fill(u16::MAX);
        }

        for layer in &scene.layers {
            if layer.distance < camera.near || layer.distance > camera.far {
                continue;
            }
            let fragment_depth = quantize_depth(projection.device_depth(layer.distance));
            let (x0, x1) = covered_range(layer.rect[0], layer.rect[2], width);
            let (top0, top1) = covered_range(layer.rect[1], layer.rect[3], height);

            for top_row in top0..top1 {
                let row = (height - 1 - top_row) as usize;
                for col in x0..x1 {
                    let index = row * width as usize + col as usize;
                    if let Some(depth) = storage.depth.as_mut() {
                        if fragment_depth >= depth[index] {
                            continue;
                        }
                        depth[index] = fragment_depth;
                    }
                    storage.color[index * 4..index * 4 + 4].copy_from_slice(&layer.color);
                }
            }
        }

        self.stats.render_passes += 1;
        Ok(())
    }

    fn post_process_depth(
        &mut self,
        source: &SoftwareTarget,
        params: DepthLinearization,
        dest: &SoftwareTarget,
    ) -> SoftwareResult<()> {
        let src = self.storage(source)?;
        if src.options.depth != DepthAttachment::Texture16 {
            return Err(SoftwareError::MissingDepthTexture(source.id));
        }
        let depth = src
            .depth
            .clone()
            .ok_or(SoftwareError::MissingDepthTexture(source.id))?;
        let size = (src.width, src.height);

        let out = self.storage_mut(dest)?;
        if (out.width, out.height) != size {
            return Err(SoftwareError::SizeMismatch);
        }
        for (px, sample) in out.color.chunks_exact_mut(4).zip(depth) {
            let device_depth = f32::from(sample) / f32::from(u16::MAX);
            px.copy_from_slice(&depth_to_gray(params.linearize(device_depth)));
        }

        self.stats.render_passes += 1;
        Ok(())
    }

    fn read_pixels(
        &mut self,
        target: &SoftwareTarget,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> SoftwareResult<PixelBuffer> {
        if std::mem::take(&mut self.fail_readback) {
            return Err(SoftwareError::ContextLost);
        }
        let storage = self.storage(target)?;
        if x + width > storage.width || y + height > storage.height {
            return Err(SoftwareError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                target_width: storage.width,
                target_height: storage.height,
            });
        }

        let stride = storage.width as usize * 4;
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for row in y..y + height {
            let start = row as usize * stride + x as usize * 4;
            data.extend_from_slice(&storage.color[start..start + width as usize * 4]);
        }

        self.stats.readbacks += 1;
        Ok(PixelBuffer::new(width, height, data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn pixel(buffer: &PixelBuffer, x: u32, row: u32) -> [u8; 4] {
        let px = &buffer.row(row)[x as usize * 4..x as usize * 4 + 4];
        [px[0], px[1], px[2], px[3]]
    }

    #[test]
    fn test_covered_range() {
        assert_eq!(covered_range(0.0, 1.0, 10), (0, 10));
        assert_eq!(covered_range(0.0, 0.5, 10), (0, 5));
        assert_eq!(covered_range(0.25, 0.75, 4), (1, 3));
        assert_eq!(covered_range(-1.0, 2.0, 3), (0, 3));
    }

    #[test]
    fn test_top_layer_lands_in_last_rows() {
        let mut renderer = SoftwareRenderer::new(4, 4, 64);
        let target = renderer
            .create_render_target(4, 4, &TargetOptions::color())
            .unwrap();
        let scene = SoftwareScene::new(WHITE).with_layer([0.0, 0.0, 1.0, 0.25], 5.0, RED);
        renderer
            .render_into(&scene, &SoftwareCamera::default(), &target)
            .unwrap();

        let buffer = renderer.read_pixels(&target, 0, 0, 4, 4).unwrap();
        // Screen top is the last scanline in read-back order.
        assert_eq!(pixel(&buffer, 0, 3), RED);
        assert_eq!(pixel(&buffer, 0, 2), WHITE);
        assert_eq!(pixel(&buffer, 0, 0), WHITE);
    }

    #[test]
    fn test_depth_test_keeps_nearest_layer() {
        let mut renderer = SoftwareRenderer::new(2, 2, 64);
        let target = renderer
            .create_render_target(2, 2, &TargetOptions::color())
            .unwrap();
        let scene = SoftwareScene::new(WHITE)
            .with_layer([0.0, 0.0, 1.0, 1.0], 2.0, RED)
            .with_layer([0.0, 0.0, 1.0, 1.0], 8.0, BLUE);
        renderer
            .render_into(&scene, &SoftwareCamera::default(), &target)
            .unwrap();
        let buffer = renderer.read_pixels(&target, 0, 0, 2, 2).unwrap();
        assert!(buffer.data().chunks(4).all(|px| px == RED));
    }

    #[test]
    fn test_read_region_out_of_bounds() {
        let mut renderer = SoftwareRenderer::new(2, 2, 64);
        let target = renderer
            .create_render_target(2, 2, &TargetOptions::color())
            .unwrap();
        let err = renderer.read_pixels(&target, 1, 0, 2, 2).unwrap_err();
        assert!(matches!(err, SoftwareError::RegionOutOfBounds { .. }));
    }

    #[test]
    fn test_target_limit() {
        let mut renderer = SoftwareRenderer::new(2, 2, 64);
        let err = renderer
            .create_render_target(65, 1, &TargetOptions::color())
            .unwrap_err();
        assert!(matches!(err, SoftwareError::TargetTooLarge { .. }));
    }

    #[test]
    fn test_post_process_requires_depth_texture() {
        let mut renderer = SoftwareRenderer::new(2, 2, 64);
        let source = renderer
            .create_render_target(2, 2, &TargetOptions::color())
            .unwrap();
        let dest = renderer
            .create_render_target(2, 2, &TargetOptions::post_process())
            .unwrap();
        let err = renderer
            .post_process_depth(&source, DepthLinearization::new(0.1, 100.0), &dest)
            .unwrap_err();
        assert!(matches!(err, SoftwareError::MissingDepthTexture(_)));
    }

    #[test]
    fn test_cleared_depth_linearizes_to_white() {
        let mut renderer = SoftwareRenderer::new(2, 2, 64);
        let source = renderer
            .create_render_target(2, 2, &TargetOptions::depth_capture())
            .unwrap();
        let dest = renderer
            .create_render_target(2, 2, &TargetOptions::post_process())
            .unwrap();
        let camera = SoftwareCamera::default();
        renderer
            .render_into(&SoftwareScene::new(RED), &camera, &source)
            .unwrap();
        renderer
            .post_process_depth(&source, DepthLinearization::from_camera(&camera), &dest)
            .unwrap();
        let buffer = renderer.read_pixels(&dest, 0, 0, 2, 2).unwrap();
        assert!(buffer.data().chunks(4).all(|px| px == WHITE));
    }

    #[test]
    fn test_dispose_releases_target() {
        let mut renderer = SoftwareRenderer::new(2, 2, 64);
        let target = renderer
            .create_render_target(2, 2, &TargetOptions::color())
            .unwrap();
        assert_eq!(renderer.live_targets(), 1);
        renderer.dispose_target(target);
        assert_eq!(renderer.live_targets(), 0);
        assert_eq!(renderer.stats().targets_disposed, 1);
    }
}
