//! Error types for the highres facade.

use highres_core::CaptureError;
use highres_render::RenderError;
use thiserror::Error;

/// Errors surfaced by the facade.
#[derive(Error, Debug)]
pub enum HighresError {
    /// A capture failed or was rejected.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The GPU backend could not be created.
    #[error("render backend error: {0}")]
    Render(#[from] RenderError),
}

/// A specialized Result type for facade operations.
pub type Result<T> = std::result::Result<T, HighresError>;
