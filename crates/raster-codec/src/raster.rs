//! RGBA raster buffers holding one encoded frame pair.

use wind_common::{CodecError, CodecResult};

use crate::quantize::{Pixel, PIXEL_BYTES};

/// A `rows x cols` array of 4-byte pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    rows: usize,
    cols: usize,
    bytes: Vec<u8>,
}

impl Raster {
    /// Wrap raw RGBA bytes; the length must be `rows * cols * 4`.
    pub fn new(rows: usize, cols: usize, bytes: Vec<u8>) -> CodecResult<Self> {
        let expected = rows * cols * PIXEL_BYTES;
        if bytes.len() != expected {
            return Err(CodecError::BufferLength {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self { rows, cols, bytes })
    }

    /// Build a raster from per-cell pixels.
    pub(crate) fn from_pixels(rows: usize, cols: usize, pixels: Vec<Pixel>) -> Self {
        debug_assert_eq!(pixels.len(), rows * cols);
        Self {
            rows,
            cols,
            bytes: pixels.into_iter().flatten().collect(),
        }
    }

    /// A raster with every byte zero.
    pub fn zeroed(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            bytes: vec![0; rows * cols * PIXEL_BYTES],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Image width in pixels (columns).
    pub fn width(&self) -> usize {
        self.cols
    }

    /// Image height in pixels (rows).
    pub fn height(&self) -> usize {
        self.rows
    }

    /// Pixel at a cell.
    pub fn pixel(&self, row: usize, col: usize) -> Option<Pixel> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.pixel_at(row * self.cols + col))
    }

    #[inline(always)]
    pub(crate) fn pixel_at(&self, cell: usize) -> Pixel {
        let offset = cell * PIXEL_BYTES;
        [
            self.bytes[offset],
            self.bytes[offset + 1],
            self.bytes[offset + 2],
            self.bytes[offset + 3],
        ]
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
