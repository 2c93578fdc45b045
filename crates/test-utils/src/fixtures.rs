//! Common test fixtures for windpack tests.
//!
//! This module provides pre-defined grid shapes that represent common
//! scenarios in wind data conversion.

use std::path::Path;

use tempfile::TempDir;

/// Common grid shapes for testing.
pub mod grid {
    /// GFS global grid (0.25 degree resolution)
    pub const GFS_QUARTER: GridSpec = GridSpec { rows: 721, cols: 1440 };

    /// GFS global grid (1 degree resolution)
    pub const GFS_ONE_DEGREE: GridSpec = GridSpec { rows: 181, cols: 360 };

    /// Exactly one 16x16 tile
    pub const ONE_TILE: GridSpec = GridSpec { rows: 16, cols: 16 };

    /// One cell past a tile edge in both directions
    pub const RAGGED: GridSpec = GridSpec { rows: 17, cols: 33 };

    /// Small non-square grid
    pub const SMALL: GridSpec = GridSpec { rows: 2, cols: 3 };

    /// Single cell
    pub const SINGLE: GridSpec = GridSpec { rows: 1, cols: 1 };

    /// Shape of a test grid.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GridSpec {
        pub rows: usize,
        pub cols: usize,
    }

    impl GridSpec {
        /// Total number of cells.
        pub fn cells(&self) -> usize {
            self.rows * self.cols
        }
    }

    /// Shapes that exercise tile boundaries.
    pub const EDGE_CASES: [GridSpec; 4] = [SINGLE, SMALL, ONE_TILE, RAGGED];
}

/// A scratch directory holding input and output folders for a conversion.
pub struct ScratchDirs {
    root: TempDir,
}

impl ScratchDirs {
    /// Create `input/` and `output/` under a fresh temporary directory.
    pub fn new() -> std::io::Result<Self> {
        let root = tempfile::tempdir()?;
        std::fs::create_dir_all(root.path().join("input"))?;
        std::fs::create_dir_all(root.path().join("output"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn input(&self) -> std::path::PathBuf {
        self.root.path().join("input")
    }

    pub fn output(&self) -> std::path::PathBuf {
        self.root.path().join("output")
    }
}
