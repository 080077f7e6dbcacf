//! Capture sizing against the GPU texture limit.

use serde::{Deserialize, Serialize};

use crate::request::CaptureRequest;

/// The fixed tile multiplied by the scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseTile {
    pub width: u32,
    pub height: u32,
}

impl Default for BaseTile {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 2048,
        }
    }
}

/// Drawing-buffer size of a capture together with the pixel ratio that produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Effective pixel ratio, at least 1.
    pub factor: u32,
}

impl CaptureDimensions {
    /// Size the renderer viewport is set to before the pixel ratio is applied.
    pub fn logical_size(&self) -> (u32, u32) {
        (self.width / self.factor, self.height / self.factor)
    }

    /// Number of bytes of an RGBA8 buffer of this size.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Printed size in whole inches at the given resolution.
    pub fn print_size(&self, dpi: u32) -> (u32, u32) {
        let dpi = dpi.max(1);
        (self.width / dpi, self.height / dpi)
    }
}

/// Largest scale factor whose capture still fits in a texture of `max_texture_size`.
///
/// The larger tile side is used so that non-square tiles never overflow.
pub fn max_factor(max_texture_size: u32, base: BaseTile) -> u32 {
    let side = base.width.max(base.height).max(1);
    max_texture_size / side
}

/// Computes the capture size for `request`.
///
/// Scale factor 0 uses `viewport` (clamped to the texture limit) at pixel ratio 1.
/// Any other factor multiplies `base`; callers must have rejected factors above
/// [`max_factor`] beforehand.
pub fn compute_dimensions(
    request: &CaptureRequest,
    viewport: (u32, u32),
    base: BaseTile,
    max_texture_size: u32,
) -> CaptureDimensions {
    if request.is_viewport_capture() {
        let limit = max_texture_size.max(1);
        return CaptureDimensions {
            width: viewport.0.clamp(1, limit),
            height: viewport.1.clamp(1, limit),
            factor: 1,
        };
    }

    let factor = request.scale_factor();
    debug_assert!(
        factor <= max_factor(max_texture_size, base),
        "scale factor {factor} exceeds texture limit {max_texture_size}"
    );
    CaptureDimensions {
        width: base.width * factor,
        height: base.height * factor,
        factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::CaptureMode;
    use proptest::prelude::*;

    #[test]
    fn test_max_factor() {
        assert_eq!(max_factor(16384, BaseTile::default()), 8);
        assert_eq!(max_factor(8192, BaseTile::default()), 4);
        assert_eq!(max_factor(4095, BaseTile::default()), 1);
        assert_eq!(max_factor(1024, BaseTile::default()), 0);
    }

    #[test]
    fn test_max_factor_uses_larger_side() {
        let tile = BaseTile {
            width: 1000,
            height: 3000,
        };
        assert_eq!(max_factor(8192, tile), 2);
    }

    #[test]
    fn test_single_tile_capture() {
        let dims = compute_dimensions(
            &CaptureRequest::color(1),
            (800, 600),
            BaseTile::default(),
            8192,
        );
        assert_eq!(
            dims,
            CaptureDimensions {
                width: 2048,
                height: 2048,
                factor: 1
            }
        );
        assert_eq!(dims.logical_size(), (2048, 2048));
    }

    #[test]
    fn test_viewport_capture() {
        let dims = compute_dimensions(
            &CaptureRequest::color(0),
            (800, 600),
            BaseTile::default(),
            8192,
        );
        assert_eq!(dims.width, 800);
        assert_eq!(dims.height, 600);
        assert_eq!(dims.factor, 1);
    }

    #[test]
    fn test_viewport_capture_clamped_to_texture_limit() {
        let dims = compute_dimensions(
            &CaptureRequest::color(0),
            (10_000, 0),
            BaseTile::default(),
            4096,
        );
        assert_eq!(dims.width, 4096);
        assert_eq!(dims.height, 1);
    }

    #[test]
    fn test_scaled_capture_logical_size() {
        let dims = compute_dimensions(
            &CaptureRequest::depth(3),
            (800, 600),
            BaseTile::default(),
            8192,
        );
        assert_eq!((dims.width, dims.height), (6144, 6144));
        assert_eq!(dims.logical_size(), (2048, 2048));
        assert_eq!(dims.byte_len(), 6144 * 6144 * 4);
    }

    #[test]
    fn test_print_size() {
        let dims = CaptureDimensions {
            width: 4096,
            height: 2048,
            factor: 2,
        };
        assert_eq!(dims.print_size(300), (13, 6));
    }

    proptest! {
        #[test]
        fn prop_dimensions_within_texture_limit(
            max_texture_size in 1u32..32768,
            viewport_w in 0u32..20000,
            viewport_h in 0u32..20000,
            pick in 0u32..64,
        ) {
            let base = BaseTile::default();
            let max = max_factor(max_texture_size, base);
            let factor = pick % (max + 1);
            let request = CaptureRequest::new(factor, CaptureMode::Color);
            let dims =
                compute_dimensions(&request, (viewport_w, viewport_h), base, max_texture_size);

            prop_assert!(dims.width >= 1 && dims.height >= 1);
            prop_assert!(dims.width <= max_texture_size.max(1));
            prop_assert!(dims.height <= max_texture_size.max(1));
            if factor > 0 {
                prop_assert_eq!(dims.width, dims.height);
                prop_assert_eq!(dims.width, base.width * factor);
            } else {
                prop_assert_eq!(dims.factor, 1);
            }
        }
    }
}
