//! Test data generators for creating synthetic wind datasets.
//!
//! These generators create predictable, verifiable patterns that can be used
//! across the test suite and the benchmarks.

use wind_common::{Coordinates, Frame, Grid, TimeSeries, WindDataset};

/// Creates a latitude axis running north to south.
///
/// The axis spans `[90, -90]` evenly; a single row sits on the equator.
///
/// # Example
///
/// ```
/// use test_utils::create_lat_axis;
///
/// let lat = create_lat_axis(3);
/// assert_eq!(lat, vec![90.0, 0.0, -90.0]);
/// ```
pub fn create_lat_axis(rows: usize) -> Vec<f32> {
    linspace(90.0, -90.0, rows)
}

/// Creates a longitude axis running west to east over `[-180, 180)`.
pub fn create_lon_axis(cols: usize) -> Vec<f32> {
    if cols == 0 {
        return Vec::new();
    }
    let step = 360.0 / cols as f32;
    (0..cols).map(|i| -180.0 + i as f32 * step).collect()
}

/// Creates global coordinates for a `rows x cols` grid.
pub fn create_coordinates(rows: usize, cols: usize) -> Coordinates {
    Coordinates::new(create_lat_axis(rows), create_lon_axis(cols))
}

/// Creates a U-component wind grid (west-east component).
///
/// U varies by latitude (row), simulating a trade winds pattern, and is
/// shifted by `phase` so that successive frames differ.
pub fn create_u_wind_grid(rows: usize, cols: usize, phase: f32) -> Grid {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let lat_factor = (row as f32 / rows.max(1) as f32 - 0.5) * 2.0; // -1 to 1
        for col in 0..cols {
            let wave = ((col as f32 * 0.3) + phase).sin() * 5.0;
            data.push(lat_factor * 20.0 + wave); // about -25 to +25 m/s
        }
    }
    grid(rows, cols, data)
}

/// Creates a V-component wind grid (south-north component).
///
/// V varies by longitude (column).
pub fn create_v_wind_grid(rows: usize, cols: usize, phase: f32) -> Grid {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let wave = ((row as f32 * 0.2) + phase).cos() * 4.0;
        for col in 0..cols {
            let lon_factor = (col as f32 / cols.max(1) as f32 - 0.5) * 2.0; // -1 to 1
            data.push(lon_factor * 15.0 + wave); // about -19 to +19 m/s
        }
    }
    grid(rows, cols, data)
}

/// Creates a wind grid that pushes past the codec's wind range.
///
/// Values sweep from -75 to +75 m/s, so roughly a third of the cells clamp.
pub fn create_storm_grid(rows: usize, cols: usize) -> Grid {
    let cells = rows * cols;
    let data = (0..cells)
        .map(|i| {
            if cells <= 1 {
                0.0
            } else {
                -75.0 + 150.0 * i as f32 / (cells - 1) as f32
            }
        })
        .collect();
    grid(rows, cols, data)
}

/// Creates one wind frame.
pub fn create_wind_frame(rows: usize, cols: usize, phase: f32) -> Frame {
    Frame {
        a: create_u_wind_grid(rows, cols, phase),
        b: create_v_wind_grid(rows, cols, phase),
    }
}

/// Creates a series of `frames` wind frames that drift over time.
///
/// # Panics
///
/// Panics if `frames` is zero.
pub fn create_wind_series(rows: usize, cols: usize, frames: usize) -> TimeSeries {
    let frames = (0..frames)
        .map(|t| create_wind_frame(rows, cols, t as f32 * 0.5))
        .collect();
    TimeSeries::new(frames).expect("a wind series needs at least one frame")
}

/// Creates a complete dataset: global coordinates plus a drifting series.
pub fn create_wind_dataset(rows: usize, cols: usize, frames: usize) -> WindDataset {
    WindDataset {
        coords: create_coordinates(rows, cols),
        series: create_wind_series(rows, cols, frames),
    }
}

/// Replaces every `stride`-th value of a grid with NaN (missing data).
pub fn with_missing_values(grid: &Grid, stride: usize) -> Grid {
    let stride = stride.max(1);
    let data = grid
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, &v)| if i % stride == 0 { f32::NAN } else { v })
        .collect();
    self::grid(grid.rows(), grid.cols(), data)
}

fn linspace(start: f32, end: f32, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![(start + end) / 2.0],
        _ => {
            let step = (end - start) / (n - 1) as f32;
            (0..n).map(|i| start + i as f32 * step).collect()
        }
    }
}

fn grid(rows: usize, cols: usize, data: Vec<f32>) -> Grid {
    Grid::new(rows, cols, data).expect("generator produced rows * cols values")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axes() {
        assert_eq!(create_lat_axis(1), vec![0.0]);
        assert_eq!(create_lat_axis(5), vec![90.0, 45.0, 0.0, -45.0, -90.0]);
        assert_eq!(create_lon_axis(4), vec![-180.0, -90.0, 0.0, 90.0]);
        assert!(create_lon_axis(0).is_empty());
    }

    #[test]
    fn test_wind_grids_stay_in_range() {
        let frame = create_wind_frame(20, 30, 1.0);
        assert_eq!(frame.shape(), (20, 30));
        for &v in frame.a.as_slice().iter().chain(frame.b.as_slice()) {
            assert!((-50.0..=50.0).contains(&v), "value {} out of range", v);
        }
    }

    #[test]
    fn test_series_frames_differ() {
        let series = create_wind_series(4, 6, 3);
        assert_eq!(series.len(), 3);
        assert_ne!(series.frame(0), series.frame(1));
    }

    #[test]
    fn test_storm_grid_extent() {
        let grid = create_storm_grid(3, 3);
        assert_eq!(grid.value_range(), Some((-75.0, 75.0)));
    }

    #[test]
    fn test_missing_values() {
        let grid = with_missing_values(&create_storm_grid(2, 2), 2);
        assert!(grid.as_slice()[0].is_nan());
        assert!(!grid.as_slice()[1].is_nan());
        assert!(grid.as_slice()[2].is_nan());
    }
}
