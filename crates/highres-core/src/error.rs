//! Error types for highres-rs.

use thiserror::Error;

/// Boxed error raised by a renderer collaborator.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for capture operations.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The requested scale factor exceeds what the GPU texture limit allows.
    #[error("invalid capture request: scale factor {requested} exceeds maximum {max}")]
    InvalidRequest { requested: u32, max: u32 },

    /// The renderer failed while allocating, drawing into or reading a target.
    #[error("read-back failure: {0}")]
    ReadbackFailure(#[source] BackendError),

    /// Encoding the image or handing it to the sink failed.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] PersistError),

    /// Capture options failed validation.
    #[error("invalid capture options: {0}")]
    InvalidOptions(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CaptureError {
    /// Wraps a collaborator error as a read-back failure.
    pub fn readback(err: impl Into<BackendError>) -> Self {
        Self::ReadbackFailure(err.into())
    }
}

/// Errors raised while encoding or persisting a captured image.
#[derive(Error, Debug)]
pub enum PersistError {
    /// PNG encoding failed.
    #[error("PNG encoding error: {0}")]
    Encode(#[from] image::ImageError),

    /// Writing the image failed.
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),

    /// The sink refused the image.
    #[error("sink rejected image: {0}")]
    Rejected(String),
}

/// A specialized Result type for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;
