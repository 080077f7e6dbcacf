//! wgpu backend for highres-rs.
//!
//! This crate implements [`highres_core::CaptureRenderer`] on a headless wgpu
//! device, including:
//! - Offscreen color targets with depth buffers or sampleable depth textures
//! - Flat-colored triangle scenes and a perspective camera
//! - The depth linearization post-process (WGSL)
//! - Aligned, banded texture read-back

// Pixel and buffer math converts between u32 sizes and usize offsets
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod camera;
pub mod depth_pass;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod readback;
pub mod scene;
pub mod target;

pub use camera::{Camera, CameraUniforms};
pub use depth_pass::{DepthLinearizePass, DepthUniforms};
pub use engine::HeadlessEngine;
pub use error::{RenderError, RenderResult};
pub use pipeline::FlatColorPipelines;
pub use readback::{aligned_bytes_per_row, read_texture_region};
pub use scene::{Mesh, Scene, Vertex};
pub use target::{OffscreenTarget, COLOR_FORMAT};
