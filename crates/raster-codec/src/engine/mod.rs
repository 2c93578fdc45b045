//! Execution strategies for the per-cell codec.
//!
//! Both strategies call the same kernels from [`crate::quantize`], so for a
//! given input they produce byte-identical rasters. Which one runs is an
//! execution detail chosen by [`select_strategy`].

pub mod device;
pub mod parallel;
pub mod sequential;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wind_common::{ChannelPair, CodecResult, Frame, Grid};

use crate::config::CodecConfig;
use crate::raster::Raster;

pub use device::{ComputeDevice, DeviceBuffer, LaunchConfig, RayonDevice, DEFAULT_TILE};
pub use parallel::DataParallelStrategy;
pub use sequential::SequentialStrategy;

/// Coordinate axes copied onto a device once and reused by every frame.
#[derive(Debug, Clone)]
pub struct ResidentAxes {
    pub(crate) rows: DeviceBuffer<f32>,
    pub(crate) cols: DeviceBuffer<f32>,
}

impl ResidentAxes {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }
}

/// The per-cell values a strategy encodes.
#[derive(Debug, Clone, Copy)]
pub enum CellInput<'a> {
    /// Two co-registered grids; the caller has checked their shapes match.
    Grids { a: &'a Grid, b: &'a Grid },
    /// Channel A indexed by row, channel B indexed by column.
    Axes { rows: &'a [f32], cols: &'a [f32] },
    /// Axes already resident on the strategy's device.
    Resident(&'a ResidentAxes),
}

impl<'a> CellInput<'a> {
    /// `(rows, cols)` of the index space.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            CellInput::Grids { a, .. } => a.shape(),
            CellInput::Axes { rows, cols } => (rows.len(), cols.len()),
            CellInput::Resident(axes) => axes.shape(),
        }
    }

    /// Values of both channels at a cell.
    #[inline(always)]
    pub fn values(&self, row: usize, col: usize) -> (f32, f32) {
        match self {
            CellInput::Grids { a, b } => {
                let cell = row * a.cols() + col;
                (a.as_slice()[cell], b.as_slice()[cell])
            }
            CellInput::Axes { rows, cols } => (rows[row], cols[col]),
            CellInput::Resident(axes) => {
                (axes.rows.device_slice()[row], axes.cols.device_slice()[col])
            }
        }
    }
}

/// Which strategy ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Sequential,
    DataParallel,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::DataParallel => "data_parallel",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A way of running the grid codec over every cell.
pub trait GridCodecStrategy: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> StrategyKind;

    /// Encode every cell of `input` into a raster.
    fn encode(&self, input: &CellInput<'_>, ranges: &ChannelPair) -> Raster;

    /// Decode every pixel of `raster` into a frame.
    fn decode(&self, raster: &Raster, ranges: &ChannelPair) -> CodecResult<Frame>;

    /// Stage coordinate axes for reuse across frames. Host-only strategies
    /// have nothing to stage.
    fn make_resident(&self, _rows: &[f32], _cols: &[f32]) -> Option<ResidentAxes> {
        None
    }
}

/// Pick a strategy for `config`, probing for the default device.
pub fn select_strategy(config: &CodecConfig) -> Arc<dyn GridCodecStrategy> {
    select_strategy_with(config, || RayonDevice::new(config.device_threads))
}

/// Pick a strategy for `config` using `open_device` to obtain the device.
///
/// Falls back to the sequential strategy when the accelerator is disabled,
/// cannot be created, or reports itself unavailable.
pub fn select_strategy_with<D, P>(config: &CodecConfig, open_device: P) -> Arc<dyn GridCodecStrategy>
where
    D: ComputeDevice + 'static,
    P: FnOnce() -> CodecResult<D>,
{
    if !config.accelerator {
        info!(strategy = %StrategyKind::Sequential, "Accelerator disabled by configuration");
        return Arc::new(SequentialStrategy);
    }

    match open_device() {
        Ok(device) if device.is_available() => {
            info!(
                strategy = %StrategyKind::DataParallel,
                device = device.name(),
                tile_rows = config.tile_rows,
                tile_cols = config.tile_cols,
                "Selected execution strategy"
            );
            Arc::new(DataParallelStrategy::new(
                device,
                config.tile_rows,
                config.tile_cols,
            ))
        }
        Ok(device) => {
            warn!(
                device = device.name(),
                "Accelerator reports unavailable, falling back to sequential strategy"
            );
            Arc::new(SequentialStrategy)
        }
        Err(e) => {
            warn!(error = %e, "Accelerator unavailable, falling back to sequential strategy");
            Arc::new(SequentialStrategy)
        }
    }
}
