//! Texture read-back through mapped staging buffers.
//!
//! Rows are copied with the padding wgpu requires between them, in bands small
//! enough for one staging buffer each, and then written bottom-up so the result
//! matches the [`PixelBuffer`] row order.

use highres_core::PixelBuffer;

use crate::error::{RenderError, RenderResult};

const BYTES_PER_PIXEL: u32 = 4;

/// Calculates bytes per row with proper alignment for wgpu buffer copies.
pub fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

/// Byte length of a tightly packed `width` x `height` RGBA8 region.
pub fn region_byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL as usize
}

/// Number of padded rows that fit into one staging buffer.
pub fn rows_per_band(width: u32, max_buffer_size: u64) -> u32 {
    let padded = u64::from(aligned_bytes_per_row(width));
    (max_buffer_size / padded).clamp(1, u64::from(u32::MAX)) as u32
}

/// Copies the `width`-pixel rows of a padded, top-down band into `out`.
///
/// `first_row` is the top-down index of the band's first row within a region
/// of `region_height` rows; `out` holds that region bottom-up.
pub fn write_band_bottom_up(
    padded: &[u8],
    width: u32,
    first_row: u32,
    band_rows: u32,
    region_height: u32,
    out: &mut [u8],
) {
    let row_bytes = region_byte_len(width, 1);
    let padded_row = aligned_bytes_per_row(width) as usize;
    for band_row in 0..band_rows {
        let src_start = band_row as usize * padded_row;
        let dst_row = (region_height - 1 - (first_row + band_row)) as usize;
        let dst_start = dst_row * row_bytes;
        out[dst_start..dst_start + row_bytes]
            .copy_from_slice(&padded[src_start..src_start + row_bytes]);
    }
}

/// Reads a `width` x `height` region of `texture` whose top edge is `top`.
///
/// The returned buffer is bottom-up.
pub fn read_texture_region(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    x: u32,
    top: u32,
    width: u32,
    height: u32,
) -> RenderResult<PixelBuffer> {
    let bytes_per_row = aligned_bytes_per_row(width);
    let band_height = rows_per_band(width, device.limits().max_buffer_size).min(height.max(1));
    let mut out = vec![0u8; region_byte_len(width, height)];

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("capture staging buffer"),
        size: u64::from(bytes_per_row) * u64::from(band_height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut first_row = 0;
    while first_row < height {
        let rows = band_height.min(height - first_row);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("capture copy encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x,
                    y: top + first_row,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(rows),
                },
            },
            wgpu::Extent3d {
                width,
                height: rows,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let band_bytes = u64::from(bytes_per_row) * u64::from(rows);
        let buffer_slice = buffer.slice(..band_bytes);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|_| RenderError::DeviceLost)?;
        rx.recv()
            .map_err(|_| RenderError::BufferMapFailed)?
            .map_err(|_| RenderError::BufferMapFailed)?;

        {
            let data = buffer_slice.get_mapped_range();
            write_band_bottom_up(&data, width, first_row, rows, height, &mut out);
        }
        buffer.unmap();

        first_row += rows;
    }

    buffer.destroy();
    log::debug!(
        "Read back {width}x{height} pixels in {} band(s)",
        height.div_ceil(band_height)
    );
    Ok(PixelBuffer::new(width, height, out)?)
}
