//! Rendering error types.

use highres_core::readback::BufferSizeError;
use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Target size is zero or exceeds the device texture limit.
    #[error("render target {width}x{height} is outside the supported range 1..={max}")]
    TargetTooLarge { width: u32, height: u32, max: u32 },

    /// The target cannot be used for the requested operation.
    #[error("unsupported render target: {0}")]
    UnsupportedTarget(String),

    /// Requested read region lies outside the target.
    #[error("read region {x},{y} {width}x{height} outside {target_width}x{target_height} target")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        target_width: u32,
        target_height: u32,
    },

    /// The device reported an error for submitted work.
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Mapping the staging buffer failed.
    #[error("failed to map read-back buffer")]
    BufferMapFailed,

    /// Device lost or never finished submitted work.
    #[error("device lost while waiting for GPU")]
    DeviceLost,

    /// Read-back produced a buffer of the wrong size.
    #[error(transparent)]
    BufferSize(#[from] BufferSizeError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
