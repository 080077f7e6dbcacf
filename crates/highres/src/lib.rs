//! highres: high-resolution captures of 3D scenes.
//!
//! A [`CaptureSession`] renders the scene once into an offscreen target far
//! larger than the window, reads the pixels back, fixes the row order and
//! encodes a PNG. Depth captures write normalized view distance as grayscale
//! instead of color.
//!
//! # Quick Start
//!
//! ```no_run
//! use highres::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut scene = Scene::new(Vec4::new(0.1, 0.1, 0.1, 1.0));
//!     scene.add_quad(
//!         [
//!             Vec3::new(-1.0, -1.0, 0.0),
//!             Vec3::new(1.0, -1.0, 0.0),
//!             Vec3::new(1.0, 1.0, 0.0),
//!             Vec3::new(-1.0, 1.0, 0.0),
//!         ],
//!         Vec4::new(0.9, 0.3, 0.2, 1.0),
//!     );
//!
//!     let session = headless_session(
//!         1280,
//!         720,
//!         scene,
//!         Camera::new(1280.0 / 720.0),
//!         FileSink::new("captures"),
//!         CaptureOptions::default(),
//!     )?;
//!
//!     // 2 x 2048 = 4096 pixels square.
//!     pollster::block_on(session.capture(CaptureRequest::color(2)))?;
//!     Ok(())
//! }
//! ```
//!
//! # Keyboard triggers
//!
//! [`Highres`] wraps a session with the trigger surface: `+` or `-` arm color
//! or depth mode, then a digit captures at that factor.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod controls;
mod error;
mod headless;
mod init;
mod sink;

pub use controls::{CaptureControls, Highres, KeyOutcome, TriggerKey};
pub use error::{HighresError, Result};
pub use headless::headless_session;
pub use init::init_logging;
pub use sink::FileSink;

// Re-export core types
pub use highres_core::{
    capture_filename, compute_dimensions, max_factor, BaseTile, CaptureDimensions, CaptureError,
    CaptureMode, CaptureObserver, CaptureOptions, CaptureRenderer, CaptureRequest, CaptureSession,
    EncodedImage, ImageSink, MemorySink, PersistError, PngCompression, SessionState, Viewport,
};

// Re-export the CPU reference renderer
pub use highres_core::software::{SoftwareCamera, SoftwareRenderer, SoftwareScene};

// Re-export render types
pub use highres_render::{Camera, HeadlessEngine, Mesh, RenderError, Scene};

pub use glam::{Vec3, Vec4};
