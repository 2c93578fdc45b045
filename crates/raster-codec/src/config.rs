//! Configuration for the raster codec.

use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_TILE;

/// Configuration for the grid codec and its execution strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Use the data-parallel strategy when a device is available.
    pub accelerator: bool,

    /// Tile height for data-parallel dispatch.
    pub tile_rows: usize,

    /// Tile width for data-parallel dispatch.
    pub tile_cols: usize,

    /// Worker threads for the compute device (None = one per core).
    pub device_threads: Option<usize>,

    /// Encode the coordinates raster once per series and reuse it.
    pub reuse_coords_raster: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            accelerator: true,
            tile_rows: DEFAULT_TILE,
            tile_cols: DEFAULT_TILE,
            device_threads: None,
            reuse_coords_raster: true,
        }
    }
}

impl CodecConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CODEC_ACCELERATOR") {
            config.accelerator = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("CODEC_TILE_SIZE") {
            if let Ok(size) = val.parse() {
                config.tile_rows = size;
                config.tile_cols = size;
            }
        }

        if let Ok(val) = std::env::var("CODEC_TILE_ROWS") {
            if let Ok(size) = val.parse() {
                config.tile_rows = size;
            }
        }

        if let Ok(val) = std::env::var("CODEC_TILE_COLS") {
            if let Ok(size) = val.parse() {
                config.tile_cols = size;
            }
        }

        if let Ok(val) = std::env::var("CODEC_DEVICE_THREADS") {
            if let Ok(threads) = val.parse() {
                config.device_threads = Some(threads);
            }
        }

        if let Ok(val) = std::env::var("CODEC_REUSE_COORDS") {
            config.reuse_coords_raster = parse_bool(&val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_rows == 0 || self.tile_cols == 0 {
            return Err("tile dimensions must be > 0".to_string());
        }

        if self.tile_rows * self.tile_cols > 1024 {
            return Err(format!(
                "tile {}x{} exceeds 1024 work units",
                self.tile_rows, self.tile_cols
            ));
        }

        if self.device_threads == Some(0) {
            return Err("device_threads must be > 0".to_string());
        }

        Ok(())
    }
}

fn parse_bool(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}
