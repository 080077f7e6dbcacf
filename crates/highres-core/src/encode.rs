//! PNG serialization of assembled captures.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageError};

use crate::assemble::AssembledImage;
use crate::options::PngCompression;

impl From<PngCompression> for CompressionType {
    fn from(compression: PngCompression) -> Self {
        match compression {
            PngCompression::Default => CompressionType::Default,
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Best => CompressionType::Best,
        }
    }
}

/// Encodes `image` as an RGBA8 PNG.
pub fn encode_png(
    image: &AssembledImage,
    compression: PngCompression,
) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut bytes, compression.into(), FilterType::Adaptive);
    encoder.write_image(
        image.rows(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}
