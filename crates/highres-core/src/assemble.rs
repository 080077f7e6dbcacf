//! Row-order correction from GPU read-back order to image order.

use crate::readback::PixelBuffer;

/// Top-down RGBA8 image ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledImage {
    width: u32,
    height: u32,
    rows: Vec<u8>,
}

impl AssembledImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel data, row 0 is the top scanline.
    pub fn rows(&self) -> &[u8] {
        &self.rows
    }

    /// RGBA value at `(x, y)`, `y` counted from the top.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.rows[offset..offset + 4];
        [px[0], px[1], px[2], px[3]]
    }

    /// Converts back to read-back order.
    pub fn into_pixel_buffer(self) -> PixelBuffer {
        let rows = flip_rows(&self.rows, self.width, self.height);
        PixelBuffer::from_flipped(self.width, self.height, rows)
    }
}

/// Flips scanlines so that row 0 is the top of the image.
///
/// Destination row `y` receives source row `height - 1 - y`, i.e. the
/// `height - y`-th scanline counted from the bottom.
pub fn assemble(buffer: PixelBuffer) -> AssembledImage {
    let (width, height) = (buffer.width(), buffer.height());
    let rows = flip_rows(buffer.data(), width, height);
    AssembledImage {
        width,
        height,
        rows,
    }
}

fn flip_rows(src: &[u8], width: u32, height: u32) -> Vec<u8> {
    let stride = width as usize * 4;
    let height = height as usize;
    assert_eq!(src.len(), stride * height, "buffer does not match {width}x{height}");

    let mut dst = vec![0u8; src.len()];
    if stride == 0 {
        return dst;
    }
    for (y, dst_row) in dst.chunks_exact_mut(stride).enumerate() {
        let src_start = (height - 1 - y) * stride;
        dst_row.copy_from_slice(&src[src_start..src_start + stride]);
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Buffer whose pixel at bottom-up row `r`, column `c` is `[r, c, 7, 255]`.
    fn labeled_buffer(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for row in 0..height {
            for col in 0..width {
                data.extend_from_slice(&[row as u8, col as u8, 7, 255]);
            }
        }
        PixelBuffer::new(width, height, data).unwrap()
    }

    #[test]
    fn test_assemble_single_pixel() {
        let buffer = PixelBuffer::new(1, 1, vec![1, 2, 3, 4]).unwrap();
        let image = assemble(buffer);
        assert_eq!(image.width(), 1);
        assert_eq!(image.height(), 1);
        assert_eq!(image.pixel(0, 0), [1, 2, 3, 4]);
    }

    #[test]
    fn test_assemble_boundary_rows() {
        for height in [2u32, 3, 4, 5] {
            let image = assemble(labeled_buffer(3, height));
            // Top row comes from the last GPU row, bottom row from GPU row 0.
            assert_eq!(image.pixel(0, 0)[0], (height - 1) as u8);
            assert_eq!(image.pixel(2, height - 1)[0], 0);
            assert_eq!(image.pixel(2, height - 1)[1], 2);
        }
    }

    #[test]
    fn test_assemble_odd_height_keeps_middle_row() {
        let image = assemble(labeled_buffer(2, 5));
        assert_eq!(image.pixel(0, 2)[0], 2);
        assert_eq!(image.pixel(1, 1)[0], 3);
        assert_eq!(image.pixel(1, 3)[0], 1);
    }

    #[test]
    fn test_assemble_even_height() {
        let image = assemble(labeled_buffer(2, 4));
        let sources: Vec<u8> = (0..4).map(|y| image.pixel(0, y)[0]).collect();
        assert_eq!(sources, vec![3, 2, 1, 0]);
    }

    proptest! {
        #[test]
        fn prop_flip_is_involution(width in 1u32..24, height in 1u32..24, seed in any::<u8>()) {
            let data: Vec<u8> = (0..width * height * 4)
                .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
                .collect();
            let buffer = PixelBuffer::new(width, height, data).unwrap();
            let restored = assemble(buffer.clone()).into_pixel_buffer();
            prop_assert_eq!(restored, buffer);
        }
    }
}
