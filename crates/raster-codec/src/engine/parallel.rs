//! Data-parallel strategy: one kernel invocation per cell on a compute device.
//!
//! Every dispatch follows the same shape:
//! 1. upload the inputs (skipped for axes that are already resident)
//! 2. launch the kernel over a tile grid covering `rows x cols`
//! 3. copy the output back to the host
//!
//! Kernels read only their own cell and the broadcast ranges, so tiles need
//! no coordination beyond the launch barrier.

use std::sync::Arc;

use wind_common::{ChannelPair, CodecResult, Frame};

use super::device::{ComputeDevice, LaunchConfig, DEFAULT_TILE};
use super::sequential::split_frame;
use super::{CellInput, GridCodecStrategy, ResidentAxes, StrategyKind};
use crate::quantize::{decode_pixel, encode_pixel, Pixel, PIXEL_BYTES};
use crate::raster::Raster;

/// Runs the codec kernels on a [`ComputeDevice`] in fixed-size tiles.
#[derive(Debug)]
pub struct DataParallelStrategy<D: ComputeDevice> {
    device: Arc<D>,
    tile_rows: usize,
    tile_cols: usize,
}

impl<D: ComputeDevice> DataParallelStrategy<D> {
    pub fn new(device: D, tile_rows: usize, tile_cols: usize) -> Self {
        Self::shared(Arc::new(device), tile_rows, tile_cols)
    }

    /// Share one device between several strategies.
    pub fn shared(device: Arc<D>, tile_rows: usize, tile_cols: usize) -> Self {
        Self {
            device,
            tile_rows: tile_rows.max(1),
            tile_cols: tile_cols.max(1),
        }
    }

    /// 16x16 tiles.
    pub fn with_default_tiles(device: D) -> Self {
        Self::new(device, DEFAULT_TILE, DEFAULT_TILE)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn tile(&self) -> (usize, usize) {
        (self.tile_rows, self.tile_cols)
    }

    fn launch_config(&self, rows: usize, cols: usize) -> LaunchConfig {
        LaunchConfig::new(rows, cols, self.tile_rows, self.tile_cols)
    }
}

impl<D: ComputeDevice + 'static> GridCodecStrategy for DataParallelStrategy<D> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DataParallel
    }

    fn encode(&self, input: &CellInput<'_>, ranges: &ChannelPair) -> Raster {
        let (rows, cols) = input.shape();
        let launch = self.launch_config(rows, cols);

        let output = match *input {
            CellInput::Grids { a, b } => {
                let a_dev = self.device.upload(a.as_slice());
                let b_dev = self.device.upload(b.as_slice());
                let (a_mem, b_mem) = (a_dev.device_slice(), b_dev.device_slice());
                self.device.launch(&launch, |row, col| {
                    let cell = row * cols + col;
                    encode_pixel(a_mem[cell], b_mem[cell], ranges)
                })
            }
            CellInput::Axes { rows: lat, cols: lon } => {
                let axes = ResidentAxes {
                    rows: self.device.upload(lat),
                    cols: self.device.upload(lon),
                };
                self.launch_axes(&launch, &axes, ranges)
            }
            CellInput::Resident(axes) => self.launch_axes(&launch, axes, ranges),
        };

        Raster::from_pixels(rows, cols, output.to_host())
    }

    fn decode(&self, raster: &Raster, ranges: &ChannelPair) -> CodecResult<Frame> {
        let (rows, cols) = raster.shape();
        let launch = self.launch_config(rows, cols);

        let pixels_dev = self.device.upload(raster.as_bytes());
        let pixels = pixels_dev.device_slice();
        let output = self.device.launch(&launch, |row, col| {
            let offset = (row * cols + col) * PIXEL_BYTES;
            let pixel: Pixel = [
                pixels[offset],
                pixels[offset + 1],
                pixels[offset + 2],
                pixels[offset + 3],
            ];
            decode_pixel(pixel, ranges)
        });

        let (a, b): (Vec<f32>, Vec<f32>) = output.to_host().into_iter().unzip();
        split_frame(rows, cols, a, b)
    }

    fn make_resident(&self, rows: &[f32], cols: &[f32]) -> Option<ResidentAxes> {
        Some(ResidentAxes {
            rows: self.device.upload(rows),
            cols: self.device.upload(cols),
        })
    }
}

impl<D: ComputeDevice> DataParallelStrategy<D> {
    fn launch_axes(
        &self,
        launch: &LaunchConfig,
        axes: &ResidentAxes,
        ranges: &ChannelPair,
    ) -> super::DeviceBuffer<Pixel> {
        let (lat, lon) = (axes.rows.device_slice(), axes.cols.device_slice());
        self.device
            .launch(launch, |row, col| encode_pixel(lat[row], lon[col], ranges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RayonDevice, SequentialStrategy};
    use wind_common::Grid;

    fn strategy(tile: usize) -> DataParallelStrategy<RayonDevice> {
        DataParallelStrategy::new(RayonDevice::new(Some(4)).unwrap(), tile, tile)
    }

    fn wind_grids(rows: usize, cols: usize) -> (Grid, Grid) {
        let a = (0..rows * cols).map(|i| (i as f32 * 0.37) % 120.0 - 60.0).collect();
        let b = (0..rows * cols).map(|i| 55.0 - (i as f32 * 0.91) % 110.0).collect();
        (
            Grid::new(rows, cols, a).unwrap(),
            Grid::new(rows, cols, b).unwrap(),
        )
    }

    #[test]
    fn test_matches_sequential_on_ragged_tiles() {
        let (a, b) = wind_grids(17, 33);
        let input = CellInput::Grids { a: &a, b: &b };
        let parallel = strategy(16).encode(&input, &ChannelPair::WIND);
        let sequential = SequentialStrategy.encode(&input, &ChannelPair::WIND);
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_resident_axes_match_host_axes() {
        let lat: Vec<f32> = (0..19).map(|i| 90.0 - i as f32 * 10.0).collect();
        let lon: Vec<f32> = (0..37).map(|i| -180.0 + i as f32 * 10.0).collect();
        let strategy = strategy(16);
        let resident = strategy.make_resident(&lat, &lon).unwrap();
        assert_eq!(resident.shape(), (19, 37));

        let from_resident = strategy.encode(&CellInput::Resident(&resident), &ChannelPair::COORDS);
        let from_host = strategy.encode(
            &CellInput::Axes { rows: &lat, cols: &lon },
            &ChannelPair::COORDS,
        );
        let sequential = SequentialStrategy.encode(
            &CellInput::Axes { rows: &lat, cols: &lon },
            &ChannelPair::COORDS,
        );
        assert_eq!(from_resident, from_host);
        assert_eq!(from_host, sequential);
    }

    #[test]
    fn test_decode_matches_sequential() {
        let (a, b) = wind_grids(5, 40);
        let raster = SequentialStrategy.encode(&CellInput::Grids { a: &a, b: &b }, &ChannelPair::WIND);
        let parallel = strategy(3).decode(&raster, &ChannelPair::WIND).unwrap();
        let sequential = SequentialStrategy.decode(&raster, &ChannelPair::WIND).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_single_cell_grid() {
        let a = Grid::filled(1, 1, 12.5);
        let b = Grid::filled(1, 1, -7.25);
        let raster = strategy(16).encode(&CellInput::Grids { a: &a, b: &b }, &ChannelPair::WIND);
        assert_eq!(raster.shape(), (1, 1));
        let frame = strategy(16).decode(&raster, &ChannelPair::WIND).unwrap();
        assert!((frame.a.get(0, 0).unwrap() - 12.5).abs() < 0.0016);
        assert!((frame.b.get(0, 0).unwrap() + 7.25).abs() < 0.0016);
    }
}
