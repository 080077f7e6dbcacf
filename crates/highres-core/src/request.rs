//! Capture requests.

use serde::{Deserialize, Serialize};

/// What a capture renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CaptureMode {
    /// The regular shaded scene.
    #[default]
    Color,
    /// Linearized depth as grayscale, near is black and far is white.
    Depth,
}

impl CaptureMode {
    /// Returns display name.
    pub fn name(self) -> &'static str {
        match self {
            CaptureMode::Color => "color",
            CaptureMode::Depth => "depth",
        }
    }
}

/// A single capture request.
///
/// A `scale_factor` of 0 captures at the live viewport size, any other value
/// multiplies the base tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    scale_factor: u32,
    mode: CaptureMode,
}

impl CaptureRequest {
    /// Creates a request.
    pub fn new(scale_factor: u32, mode: CaptureMode) -> Self {
        Self { scale_factor, mode }
    }

    /// Creates a color request.
    pub fn color(scale_factor: u32) -> Self {
        Self::new(scale_factor, CaptureMode::Color)
    }

    /// Creates a depth request.
    pub fn depth(scale_factor: u32) -> Self {
        Self::new(scale_factor, CaptureMode::Depth)
    }

    /// Creates a request with the factor clamped to `[0, max_factor]`.
    pub fn clamped(scale_factor: u32, mode: CaptureMode, max_factor: u32) -> Self {
        Self::new(scale_factor.min(max_factor), mode)
    }

    pub fn scale_factor(&self) -> u32 {
        self.scale_factor
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Whether this request captures at viewport size.
    pub fn is_viewport_capture(&self) -> bool {
        self.scale_factor == 0
    }
}
