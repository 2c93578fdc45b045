//! Grids, frames and time series of co-registered scalar fields.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// A row-major 2D array of scalar samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Grid {
    /// Create a grid from row-major data.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> CodecResult<Self> {
        if data.len() != rows * cols {
            return Err(CodecError::dataset(format!(
                "grid holds {} values, expected {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a grid filled with a single value.
    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Create a grid from nested rows. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<f32>]) -> CodecResult<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(CodecError::shape_mismatch((i + 1, cols), (i + 1, row.len())));
            }
            data.extend_from_slice(row);
        }
        Self::new(rows.len(), cols, data)
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

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the value at a specific cell.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.data[row * self.cols + col])
    }

    /// One row of the grid; `row` must be below `rows()`.
    pub(crate) fn row(&self, row: usize) -> &[f32] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Minimum and maximum of the non-NaN values, if any.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        min_max(&self.data)
    }

    /// Copy of the data with the row order reversed (north/south flip).
    pub fn flipped_rows(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.data.len());
        for row in (0..self.rows).rev() {
            out.extend_from_slice(self.row(row));
        }
        out
    }
}

/// Minimum and maximum of the non-NaN values of a slice.
pub fn min_max(values: &[f32]) -> Option<(f32, f32)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// A pair of co-registered grids, one per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub a: Grid,
    pub b: Grid,
}

impl Frame {
    /// Pair two grids; their shapes must match.
    pub fn new(a: Grid, b: Grid) -> CodecResult<Self> {
        if a.shape() != b.shape() {
            return Err(CodecError::shape_mismatch(a.shape(), b.shape()));
        }
        Ok(Self { a, b })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.a.shape()
    }
}

/// Latitude and longitude axes of a regular grid.
///
/// Latitudes index rows and longitudes index columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub lat: Vec<f32>,
    pub lon: Vec<f32>,
}

impl Coordinates {
    pub fn new(lat: Vec<f32>, lon: Vec<f32>) -> Self {
        Self { lat, lon }
    }

    pub fn rows(&self) -> usize {
        self.lat.len()
    }

    pub fn cols(&self) -> usize {
        self.lon.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// Broadcast the axes to a latitude grid and a longitude grid.
    pub fn to_frame(&self) -> Frame {
        let (rows, cols) = self.shape();
        let mut lat = Vec::with_capacity(rows * cols);
        let mut lon = Vec::with_capacity(rows * cols);
        for &la in &self.lat {
            lat.extend(std::iter::repeat(la).take(cols));
            lon.extend_from_slice(&self.lon);
        }
        Frame {
            a: Grid { rows, cols, data: lat },
            b: Grid { rows, cols, data: lon },
        }
    }

    /// Geographic extent of the axes.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let (min_lat, max_lat) = min_max(&self.lat)?;
        let (min_lon, max_lon) = min_max(&self.lon)?;
        Some(BoundingBox::new(
            min_lon as f64,
            min_lat as f64,
            max_lon as f64,
            max_lat as f64,
        ))
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Extent of a decoded coordinates frame (latitude grid, longitude grid).
    pub fn from_frame(coords: &Frame) -> Option<Self> {
        let (min_lat, max_lat) = coords.a.value_range()?;
        let (min_lon, max_lon) = coords.b.value_range()?;
        Some(Self::new(
            min_lon as f64,
            min_lat as f64,
            max_lon as f64,
            max_lat as f64,
        ))
    }

    /// Get the width in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Get the height in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

/// An ordered sequence of frames sharing one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    rows: usize,
    cols: usize,
    frames: Vec<Frame>,
}

impl TimeSeries {
    /// Build a series from frames; every frame must share the first frame's shape.
    pub fn new(frames: Vec<Frame>) -> CodecResult<Self> {
        let (rows, cols) = frames
            .first()
            .map(Frame::shape)
            .ok_or_else(|| CodecError::dataset("time series needs at least one frame"))?;
        for frame in &frames {
            if frame.shape() != (rows, cols) {
                return Err(CodecError::shape_mismatch((rows, cols), frame.shape()));
            }
        }
        Ok(Self { rows, cols, frames })
    }

    /// Split stacked `[time, rows, cols]` arrays into frames.
    ///
    /// A plain `[rows, cols]` array is a series of one frame.
    pub fn from_stacked(rows: usize, cols: usize, a: Vec<f32>, b: Vec<f32>) -> CodecResult<Self> {
        let cells = rows * cols;
        if cells == 0 {
            return Err(CodecError::dataset(format!("empty grid {}x{}", rows, cols)));
        }
        if a.len() != b.len() {
            return Err(CodecError::shape_mismatch(
                (a.len() / cells, cells),
                (b.len() / cells, cells),
            ));
        }
        if a.len() % cells != 0 || a.is_empty() {
            return Err(CodecError::dataset(format!(
                "{} values do not split into {}x{} frames",
                a.len(),
                rows,
                cols
            )));
        }

        let frames = a
            .chunks_exact(cells)
            .zip(b.chunks_exact(cells))
            .map(|(fa, fb)| Frame {
                a: Grid { rows, cols, data: fa.to_vec() },
                b: Grid { rows, cols, data: fb.to_vec() },
            })
            .collect();
        Ok(Self { rows, cols, frames })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Channel A of every frame, concatenated in frame order.
    pub fn stacked_a(&self) -> Vec<f32> {
        self.frames.iter().flat_map(|f| f.a.as_slice().iter().copied()).collect()
    }

    /// Channel B of every frame, concatenated in frame order.
    pub fn stacked_b(&self) -> Vec<f32> {
        self.frames.iter().flat_map(|f| f.b.as_slice().iter().copied()).collect()
    }
}

/// Coordinates plus a wind time series, as handed over by the data source.
#[derive(Debug, Clone, PartialEq)]
pub struct WindDataset {
    pub coords: Coordinates,
    pub series: TimeSeries,
}

impl WindDataset {
    /// Pair coordinates with a series; the axes must match the frame shape.
    pub fn new(coords: Coordinates, series: TimeSeries) -> CodecResult<Self> {
        if coords.shape() != series.shape() {
            return Err(CodecError::shape_mismatch(coords.shape(), series.shape()));
        }
        Ok(Self { coords, series })
    }
}
