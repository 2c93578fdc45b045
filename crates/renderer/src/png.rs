//! PNG encoding and decoding for encoded rasters.
//!
//! Rasters are always written as **RGBA PNG (color type 6)** with 8 bits per
//! channel: every byte carries half of a 16-bit sample, so palette reduction
//! or any lossy step would corrupt the data.
//!
//! Reading goes through the `image` crate and accepts any PNG it can decode,
//! converted to RGBA8.

use std::io::Write;
use std::path::Path;

use image::ImageFormat;
use raster_codec::Raster;
use tracing::{debug, instrument};
use wind_common::{CodecError, CodecResult};

/// PNG file signature.
const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Encode a raster as an RGBA PNG.
pub fn encode_raster_png(raster: &Raster) -> CodecResult<Vec<u8>> {
    create_png(raster.as_bytes(), raster.width(), raster.height())
}

/// Decode a PNG into a raster (height = rows, width = cols).
pub fn decode_raster_png(data: &[u8]) -> CodecResult<Raster> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Png)
        .map_err(|e| CodecError::Image(e.to_string()))?
        .to_rgba8();
    let (width, height) = (img.width() as usize, img.height() as usize);
    Raster::new(height, width, img.into_raw())
}

/// Write a raster to a PNG file.
#[instrument(skip(raster), fields(rows = raster.rows(), cols = raster.cols()))]
pub fn write_raster_png(path: &Path, raster: &Raster) -> CodecResult<()> {
    let png = encode_raster_png(raster)?;
    std::fs::write(path, &png)?;
    debug!(bytes = png.len(), "Wrote raster PNG");
    Ok(())
}

/// Read a raster from a PNG file.
pub fn read_raster_png(path: &Path) -> CodecResult<Raster> {
    let data = std::fs::read(path)?;
    decode_raster_png(&data)
}

/// Create a PNG image from RGBA pixel data (color type 6).
///
/// # Arguments
/// - `pixels`: RGBA pixel data (4 bytes per pixel)
/// - `width`: Image width in pixels
/// - `height`: Image height in pixels
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> CodecResult<Vec<u8>> {
    let expected = width * height * 4;
    if pixels.len() != expected {
        return Err(CodecError::BufferLength {
            expected,
            actual: pixels.len(),
        });
    }
    let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(CodecError::Image(format!(
                "{}x{} is not a valid PNG size",
                width, height
            )))
        }
    };

    let mut png = Vec::new();

    // PNG signature
    png.extend_from_slice(&PNG_SIGNATURE);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&w.to_be_bytes());
    ihdr_data.extend_from_slice(&h.to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(6); // color type (RGBA)
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    // IDAT chunk (image data)
    let idat_data = deflate_idat_rgba(pixels, width, height)?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    // IEND chunk
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Deflate RGBA image data for IDAT chunk.
fn deflate_idat_rgba(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let stride = width * 4;

    // Add filter byte (0 = no filter) to each scanline
    let mut uncompressed = Vec::with_capacity(height * (1 + stride));
    for row in pixels.chunks_exact(stride) {
        uncompressed.push(0);
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}
