//! Single-threaded strategy: rows, then columns.

use wind_common::{ChannelPair, CodecResult, Frame, Grid};

use super::{CellInput, GridCodecStrategy, StrategyKind};
use crate::quantize::{decode_pixel, encode_pixel};
use crate::raster::Raster;

/// Runs the codec kernel cell by cell on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialStrategy;

impl GridCodecStrategy for SequentialStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sequential
    }

    fn encode(&self, input: &CellInput<'_>, ranges: &ChannelPair) -> Raster {
        let (rows, cols) = input.shape();
        let mut pixels = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let (a, b) = input.values(row, col);
                pixels.push(encode_pixel(a, b, ranges));
            }
        }
        Raster::from_pixels(rows, cols, pixels)
    }

    fn decode(&self, raster: &Raster, ranges: &ChannelPair) -> CodecResult<Frame> {
        let (rows, cols) = raster.shape();
        let mut a = Vec::with_capacity(rows * cols);
        let mut b = Vec::with_capacity(rows * cols);
        for cell in 0..rows * cols {
            let (va, vb) = decode_pixel(raster.pixel_at(cell), ranges);
            a.push(va);
            b.push(vb);
        }
        split_frame(rows, cols, a, b)
    }
}

/// Assemble a frame from two host vectors of `rows * cols` values.
pub(crate) fn split_frame(
    rows: usize,
    cols: usize,
    a: Vec<f32>,
    b: Vec<f32>,
) -> CodecResult<Frame> {
    Frame::new(Grid::new(rows, cols, a)?, Grid::new(rows, cols, b)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_axes_broadcast() {
        let lat = [90.0, 0.0];
        let lon = [-180.0, 180.0];
        let raster = SequentialStrategy.encode(
            &CellInput::Axes { rows: &lat, cols: &lon },
            &ChannelPair::COORDS,
        );
        assert_eq!(raster.shape(), (2, 2));
        assert_eq!(raster.pixel(0, 0), Some([0xFF, 0xFF, 0x00, 0x00]));
        assert_eq!(raster.pixel(0, 1), Some([0xFF, 0xFF, 0xFF, 0xFF]));
        assert_eq!(raster.pixel(1, 0), Some([0x80, 0x00, 0x00, 0x00]));
    }

    #[test]
    fn test_decode_inverse() {
        let a = Grid::from_rows(&[vec![-50.0, 0.0, 50.0]]).unwrap();
        let b = Grid::from_rows(&[vec![50.0, 0.0, -50.0]]).unwrap();
        let raster = SequentialStrategy.encode(&CellInput::Grids { a: &a, b: &b }, &ChannelPair::WIND);
        let frame = SequentialStrategy.decode(&raster, &ChannelPair::WIND).unwrap();
        assert_eq!(frame.a.get(0, 0), Some(-50.0));
        assert_eq!(frame.b.get(0, 0), Some(50.0));
        assert!(frame.a.get(0, 1).unwrap().abs() < 0.001);
    }
}
