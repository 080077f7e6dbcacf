//! Host renderer capabilities consumed by the capture pipeline.

use crate::depth::DepthLinearization;
use crate::readback::PixelBuffer;

/// Live viewport state of a renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Logical width.
    pub width: u32,
    /// Logical height.
    pub height: u32,
    /// Device pixels per logical pixel.
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    /// Size of the drawing buffer in device pixels.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.pixel_ratio).round() as u32,
            (self.height as f32 * self.pixel_ratio).round() as u32,
        )
    }
}

/// Depth attachment of an off-screen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthAttachment {
    /// No depth.
    None,
    /// Depth test only, not sampleable.
    #[default]
    Buffer,
    /// Sampleable 16-bit depth texture for post-processing.
    Texture16,
}

/// Filtering applied when a target is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

/// Configuration of an off-screen render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetOptions {
    pub depth: DepthAttachment,
    pub filter: TextureFilter,
    pub stencil: bool,
}

impl TargetOptions {
    /// Color target with a depth buffer.
    pub fn color() -> Self {
        Self::default()
    }

    /// Target whose depth is kept for linearization: nearest filtering, 16-bit
    /// depth texture, no stencil.
    pub fn depth_capture() -> Self {
        Self {
            depth: DepthAttachment::Texture16,
            filter: TextureFilter::Nearest,
            stencil: false,
        }
    }

    /// Target written only by a full-screen pass.
    pub fn post_process() -> Self {
        Self {
            depth: DepthAttachment::None,
            filter: TextureFilter::Nearest,
            stencil: false,
        }
    }
}

/// Camera capabilities needed while capturing.
pub trait CaptureCamera {
    /// Near clipping plane distance.
    fn near(&self) -> f32;

    /// Far clipping plane distance.
    fn far(&self) -> f32;

    /// Aspect ratio (width / height).
    fn aspect(&self) -> f32;

    /// Sets the aspect ratio and refreshes the projection.
    fn set_aspect(&mut self, aspect: f32);
}

/// Renderer capabilities needed while capturing.
///
/// Pixel buffers returned by [`read_pixels`](Self::read_pixels) use the GPU
/// read-back convention: row 0 is the bottom scanline.
pub trait CaptureRenderer {
    /// Scene drawn by [`render_into`](Self::render_into).
    type Scene;
    /// Camera the scene is drawn through.
    type Camera: CaptureCamera;
    /// Off-screen render target handle.
    type Target;
    /// Backend error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Largest supported 2D texture dimension.
    fn max_texture_size(&self) -> u32;

    /// Current viewport.
    fn viewport(&self) -> Viewport;

    /// Sets the logical viewport size.
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Sets the device pixel ratio.
    fn set_pixel_ratio(&mut self, ratio: f32);

    /// Allocates an off-screen target.
    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        options: &TargetOptions,
    ) -> Result<Self::Target, Self::Error>;

    /// Releases a target.
    fn dispose_target(&mut self, target: Self::Target);

    /// Draws `scene` through `camera` into `target`.
    fn render_into(
        &mut self,
        scene: &Self::Scene,
        camera: &Self::Camera,
        target: &Self::Target,
    ) -> Result<(), Self::Error>;

    /// Writes linearized depth of `source` as grayscale into `dest`.
    ///
    /// `source` must have been created with [`DepthAttachment::Texture16`].
    fn post_process_depth(
        &mut self,
        source: &Self::Target,
        params: DepthLinearization,
        dest: &Self::Target,
    ) -> Result<(), Self::Error>;

    /// Reads an RGBA8 region of `target`, `y` measured from the bottom edge.
    fn read_pixels(
        &mut self,
        target: &Self::Target,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, Self::Error>;
}
