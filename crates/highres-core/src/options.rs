//! Configuration options for captures.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};
use crate::sizing::BaseTile;

/// PNG compression level used when encoding captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PngCompression {
    /// Encoder default, balanced size and speed.
    #[default]
    Default,
    /// Fastest encode, larger files.
    Fast,
    /// Smallest files, slowest encode.
    Best,
}

/// Options shared by every capture of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Tile size multiplied by the scale factor.
    pub base_tile: BaseTile,

    /// PNG compression level.
    pub png_compression: PngCompression,

    /// Print resolution used when reporting the physical size of a capture.
    pub print_dpi: u32,

    /// Whether to yield to the executor once before the heavy render starts.
    pub yield_before_render: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            base_tile: BaseTile::default(),
            png_compression: PngCompression::Default,
            print_dpi: 300,
            yield_before_render: true,
        }
    }
}

impl CaptureOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base tile size.
    pub fn with_base_tile(mut self, width: u32, height: u32) -> Self {
        self.base_tile = BaseTile { width, height };
        self
    }

    /// Sets the PNG compression level.
    pub fn with_png_compression(mut self, compression: PngCompression) -> Self {
        self.png_compression = compression;
        self
    }

    /// Sets the print resolution.
    pub fn with_print_dpi(mut self, dpi: u32) -> Self {
        self.print_dpi = dpi;
        self
    }

    /// Enables or disables the scheduling yield before rendering.
    pub fn with_yield_before_render(mut self, enabled: bool) -> Self {
        self.yield_before_render = enabled;
        self
    }

    /// Checks that the options describe a usable capture configuration.
    pub fn validate(&self) -> Result<()> {
        if self.base_tile.width == 0 || self.base_tile.height == 0 {
            return Err(CaptureError::InvalidOptions(format!(
                "base tile must be non-empty, got {}x{}",
                self.base_tile.width, self.base_tile.height
            )));
        }
        if self.print_dpi == 0 {
            return Err(CaptureError::InvalidOptions(
                "print dpi must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parses and validates options from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads, parses and validates options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = CaptureOptions::default();
        assert_eq!(
            options.base_tile,
            BaseTile {
                width: 2048,
                height: 2048
            }
        );
        assert_eq!(options.png_compression, PngCompression::Default);
        assert_eq!(options.print_dpi, 300);
        assert!(options.yield_before_render);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_builder() {
        let options = CaptureOptions::new()
            .with_base_tile(512, 256)
            .with_png_compression(PngCompression::Fast)
            .with_yield_before_render(false);
        assert_eq!(options.base_tile.width, 512);
        assert_eq!(options.base_tile.height, 256);
        assert_eq!(options.png_compression, PngCompression::Fast);
        assert!(!options.yield_before_render);
    }

    #[test]
    fn test_options_partial_json_uses_defaults() {
        let options =
            CaptureOptions::from_json_str(r#"{ "base_tile": { "width": 1024, "height": 1024 } }"#)
                .unwrap();
        assert_eq!(options.base_tile.width, 1024);
        assert_eq!(options.print_dpi, 300);
        assert!(options.yield_before_render);
    }

    #[test]
    fn test_options_reject_empty_tile() {
        let err = CaptureOptions::from_json_str(r#"{ "base_tile": { "width": 0, "height": 64 } }"#)
            .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidOptions(_)));
    }

    #[test]
    fn test_options_reject_malformed_json() {
        let err = CaptureOptions::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, CaptureError::JsonError(_)));
    }
}
