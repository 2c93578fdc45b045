//! Compute devices for grid-indexed dispatch.
//!
//! A device owns its memory: inputs are copied in with [`ComputeDevice::upload`],
//! kernels run over a tiled index space with [`ComputeDevice::launch`], and
//! results come back through [`DeviceBuffer::to_host`]. The launch is a
//! synchronous barrier; nothing is observable until every tile has finished.
//!
//! ```text
//!   cols ──────────────────────────►
//!  ┌────────┬────────┬────┐
//!  │ tile   │ tile   │ ░░ │   ░ = dispatched but outside the grid (no-op)
//!  │ (0,0)  │ (0,1)  │ ░░ │
//!  ├────────┼────────┼────┤
//!  │ (1,0)  │ (1,1)  │ ░░ │
//!  └────────┴────────┴────┘
//! ```

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use wind_common::{CodecError, CodecResult};

/// Default tile edge, matching a 16x16 thread block.
pub const DEFAULT_TILE: usize = 16;

/// Geometry of one dispatch: the true grid extent plus the tile grid covering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    pub rows: usize,
    pub cols: usize,
    pub tile_rows: usize,
    pub tile_cols: usize,
}

impl LaunchConfig {
    /// Cover a `rows x cols` grid with tiles of `tile_rows x tile_cols`.
    pub fn new(rows: usize, cols: usize, tile_rows: usize, tile_cols: usize) -> Self {
        Self {
            rows,
            cols,
            tile_rows: tile_rows.max(1),
            tile_cols: tile_cols.max(1),
        }
    }

    /// Number of tile rows (ceil).
    pub fn grid_rows(&self) -> usize {
        self.rows.div_ceil(self.tile_rows)
    }

    /// Number of tile columns (ceil).
    pub fn grid_cols(&self) -> usize {
        self.cols.div_ceil(self.tile_cols)
    }

    /// Total number of tiles.
    pub fn tile_count(&self) -> usize {
        self.grid_rows() * self.grid_cols()
    }

    /// Cells per tile, including padding cells beyond the grid edge.
    pub fn tile_len(&self) -> usize {
        self.tile_rows * self.tile_cols
    }

    /// Number of dispatched work units, padding included.
    pub fn dispatched_units(&self) -> usize {
        self.tile_count() * self.tile_len()
    }

    /// Global cell index for a unit within a tile, or `None` past the grid edge.
    #[inline(always)]
    pub fn cell(&self, tile: usize, unit: usize) -> Option<(usize, usize)> {
        let grid_cols = self.grid_cols();
        let row = (tile / grid_cols) * self.tile_rows + unit / self.tile_cols;
        let col = (tile % grid_cols) * self.tile_cols + unit % self.tile_cols;
        if row < self.rows && col < self.cols {
            Some((row, col))
        } else {
            None
        }
    }
}

/// Memory resident on a compute device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceBuffer<T> {
    data: Vec<T>,
}

impl<T: Copy> DeviceBuffer<T> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Device-side view, for kernels.
    #[inline(always)]
    pub(crate) fn device_slice(&self) -> &[T] {
        &self.data
    }

    /// Copy the buffer into a fresh host vector.
    pub fn to_host(&self) -> Vec<T> {
        self.data.clone()
    }
}

/// An accelerator that runs one kernel invocation per grid cell.
pub trait ComputeDevice: Send + Sync + std::fmt::Debug {
    /// Human-readable device name for logs.
    fn name(&self) -> &str;

    /// Whether the device can accept dispatches.
    fn is_available(&self) -> bool;

    /// Copy host memory onto the device.
    fn upload<T: Copy + Send + Sync>(&self, host: &[T]) -> DeviceBuffer<T>;

    /// Run `kernel(row, col)` for every cell of the grid and block until done.
    ///
    /// Units whose index falls outside the grid are dispatched but do nothing.
    fn launch<T, K>(&self, config: &LaunchConfig, kernel: K) -> DeviceBuffer<T>
    where
        T: Copy + Default + Send + Sync,
        K: Fn(usize, usize) -> T + Sync;
}

/// A device backed by a dedicated rayon thread pool.
///
/// Each tile is one parallel task; the units of a tile run back to back and
/// write into tile-local memory, then a single write-back assembles the grid.
#[derive(Debug)]
pub struct RayonDevice {
    pool: ThreadPool,
    name: String,
}

impl RayonDevice {
    /// Build a device with `threads` workers, or one per core.
    pub fn new(threads: Option<usize>) -> CodecResult<Self> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("raster-device-{}", i));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| CodecError::AcceleratorUnavailable(e.to_string()))?;
        let name = format!("rayon-pool({} threads)", pool.current_num_threads());
        debug!(device = %name, "Created compute device");
        Ok(Self { pool, name })
    }

    /// Worker count.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ComputeDevice for RayonDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.pool.current_num_threads() > 0
    }

    fn upload<T: Copy + Send + Sync>(&self, host: &[T]) -> DeviceBuffer<T> {
        DeviceBuffer {
            data: host.to_vec(),
        }
    }

    fn launch<T, K>(&self, config: &LaunchConfig, kernel: K) -> DeviceBuffer<T>
    where
        T: Copy + Default + Send + Sync,
        K: Fn(usize, usize) -> T + Sync,
    {
        let tiles: Vec<Vec<T>> = self.pool.install(|| {
            (0..config.tile_count())
                .into_par_iter()
                .map(|tile| {
                    let mut local = vec![T::default(); config.tile_len()];
                    for (unit, slot) in local.iter_mut().enumerate() {
                        if let Some((row, col)) = config.cell(tile, unit) {
                            *slot = kernel(row, col);
                        }
                    }
                    local
                })
                .collect()
        });

        // Write-back: scatter tile-local results into the full grid.
        let mut data = vec![T::default(); config.rows * config.cols];
        for (tile, local) in tiles.iter().enumerate() {
            for (unit, value) in local.iter().enumerate() {
                if let Some((row, col)) = config.cell(tile, unit) {
                    data[row * config.cols + col] = *value;
                }
            }
        }

        DeviceBuffer { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_config_ceil() {
        let config = LaunchConfig::new(17, 33, 16, 16);
        assert_eq!(config.grid_rows(), 2);
        assert_eq!(config.grid_cols(), 3);
        assert_eq!(config.tile_count(), 6);
        assert_eq!(config.dispatched_units(), 6 * 256);
    }

    #[test]
    fn test_cell_bounds_check() {
        let config = LaunchConfig::new(17, 33, 16, 16);
        // First unit of the first tile.
        assert_eq!(config.cell(0, 0), Some((0, 0)));
        // Last tile (row 1, col 2) starts at (16, 32), only unit 0 is inside.
        assert_eq!(config.cell(5, 0), Some((16, 32)));
        assert_eq!(config.cell(5, 1), None);
        assert_eq!(config.cell(5, 16), None);
    }

    #[test]
    fn test_zero_tile_is_clamped() {
        let config = LaunchConfig::new(4, 4, 0, 0);
        assert_eq!(config.tile_rows, 1);
        assert_eq!(config.tile_count(), 16);
    }

    #[test]
    fn test_launch_covers_every_cell_once() {
        let device = RayonDevice::new(Some(4)).unwrap();
        let config = LaunchConfig::new(17, 33, 16, 16);
        let out = device.launch(&config, |row, col| (row * 1000 + col) as u32);
        let host = out.to_host();
        assert_eq!(host.len(), 17 * 33);
        for row in 0..17 {
            for col in 0..33 {
                assert_eq!(host[row * 33 + col], (row * 1000 + col) as u32);
            }
        }
    }

    #[test]
    fn test_launch_empty_grid() {
        let device = RayonDevice::new(Some(1)).unwrap();
        let out = device.launch(&LaunchConfig::new(0, 5, 16, 16), |_, _| 1u8);
        assert!(out.is_empty());
    }
}
