//! Core capture pipeline for highres-rs.
//!
//! This crate provides everything needed to turn a live 3D view into a
//! high-resolution PNG, independent of the rendering backend:
//! - [`CaptureRenderer`] and [`CaptureCamera`] traits describing the host renderer
//! - Capture sizing against the GPU texture limit
//! - Color and depth read-back paths, row-order correction and PNG encoding
//! - The single-flight [`CaptureSession`] state machine
//! - A CPU reference renderer for headless use

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Pixel math converts between u32 sizes, usize indices and f32 ratios everywhere
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

pub mod assemble;
pub mod depth;
pub mod encode;
pub mod error;
pub mod observer;
pub mod options;
pub mod readback;
pub mod renderer;
pub mod request;
pub mod session;
pub mod sink;
pub mod sizing;
pub mod software;

pub use assemble::{assemble, AssembledImage};
pub use depth::{linearize_depth, render_depth, DepthLinearization};
pub use encode::encode_png;
pub use error::{CaptureError, PersistError, Result};
pub use observer::CaptureObserver;
pub use options::{CaptureOptions, PngCompression};
pub use readback::{render_color, ActiveTargets, PixelBuffer};
pub use renderer::{
    CaptureCamera, CaptureRenderer, DepthAttachment, TargetOptions, TextureFilter, Viewport,
};
pub use request::{CaptureMode, CaptureRequest};
pub use session::{capture_filename, CaptureSession, EncodedImage, SessionState};
pub use sink::{ImageSink, MemorySink};
pub use sizing::{compute_dimensions, max_factor, BaseTile, CaptureDimensions};
