//! Lifecycle hooks for code embedding a capture session.

use crate::request::{CaptureMode, CaptureRequest};
use crate::sizing::CaptureDimensions;

/// Receives capture lifecycle notifications. Every method defaults to a no-op.
pub trait CaptureObserver {
    /// The trigger surface was activated in `mode`.
    fn on_start(&self, _mode: CaptureMode) {}

    /// A request was accepted and is about to reconfigure the renderer.
    fn on_before_render(&self, _request: &CaptureRequest, _dims: &CaptureDimensions) {}

    /// Renderer state was restored after a capture, successful or not.
    fn on_after_render(&self) {}

    /// The trigger surface was deactivated.
    fn on_exit(&self) {}
}

impl CaptureObserver for () {}
